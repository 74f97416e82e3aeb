pub mod stale_requests;
