pub mod worker_client;
