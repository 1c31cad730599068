//! dagwatch - trigger and monitor Airflow DAG runs.

pub mod auth;
pub mod client;
pub mod monitor;
