//! Test helpers: in-process mock prediction service / account backend

#![allow(dead_code)]

use axum::http::HeaderMap;
use axum::Router;
use churn_client::UploadObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// What the mock saw
#[derive(Default)]
pub struct Recorded {
    hits: AtomicUsize,
    authorization: Mutex<Option<String>>,
    query: Mutex<Option<String>>,
    body: Mutex<Vec<u8>>,
}

impl Recorded {
    pub fn record(&self, headers: &HeaderMap, query: Option<String>, body: &[u8]) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        *self.authorization.lock().unwrap() = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *self.query.lock().unwrap() = query;
        *self.body.lock().unwrap() = body.to_vec();
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn authorization(&self) -> Option<String> {
        self.authorization.lock().unwrap().clone()
    }

    pub fn query(&self) -> Option<String> {
        self.query.lock().unwrap().clone()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body.lock().unwrap()).into_owned()
    }
}

/// Observer recording every callback
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<u8>>,
    pub accepted: Mutex<Vec<String>>,
}

impl UploadObserver for RecordingObserver {
    fn on_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }

    fn on_accepted(&self, result_location: &str) {
        self.accepted.lock().unwrap().push(result_location.to_string());
    }
}

impl RecordingObserver {
    pub fn progress(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }
}

/// CSV body of roughly `rows` customer records
pub fn customer_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from(
        "Customer ID,Credit Score,Customer Tenure,Balance,NumOfProducts,Outstanding Loans,Income,Credit History Length,NumComplaints\n",
    );
    for i in 0..rows {
        csv.push_str(&format!(
            "{},{},{},{}.50,{},{},{},{},{}\n",
            i,
            500 + i % 350,
            i % 10,
            i * 37,
            1 + i % 4,
            i % 3,
            20000 + i * 11,
            i % 25,
            i % 5
        ));
    }
    csv.into_bytes()
}
