//! Network plumbing: the persistence POST and remote image fetches.
//!
//! Both are fire-and-forget relative to the UI: ehttp runs the request on a
//! background thread and the completion is pushed onto an mpsc channel that
//! the app drains on the next frame.

use std::sync::mpsc::Sender;

use log::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/annotations";

/// Completions delivered back to the UI thread.
pub enum NetEvent {
    SaveFinished {
        image_id: String,
        result: Result<(), String>,
    },
    ImageFetched {
        image_id: String,
        result: Result<Vec<u8>, String>,
    },
}

/// POST an annotation payload. Any 2xx status counts as success; there is
/// no retry or timeout here — the caller decides what a failure means.
pub fn post_annotations(endpoint: &str, body: Vec<u8>, image_id: String, tx: Sender<NetEvent>) {
    let mut request = ehttp::Request::post(endpoint, body);
    request
        .headers
        .insert("Content-Type".to_owned(), "application/json".to_owned());

    let url = endpoint.to_owned();
    ehttp::fetch(request, move |response| {
        let result = match response {
            Ok(r) if r.ok => {
                info!("saved annotations for {image_id} to {url}");
                Ok(())
            }
            Ok(r) => {
                warn!("save for {image_id} rejected: {} {}", r.status, r.status_text);
                Err(format!("server returned {} {}", r.status, r.status_text))
            }
            Err(e) => {
                warn!("save for {image_id} failed: {e}");
                Err(e)
            }
        };
        let _ = tx.send(NetEvent::SaveFinished { image_id, result });
    });
}

/// Fetch an image over HTTP; bytes are decoded on the UI side.
pub fn fetch_image(url: &str, image_id: String, tx: Sender<NetEvent>) {
    let request = ehttp::Request::get(url);
    let url = url.to_owned();
    ehttp::fetch(request, move |response| {
        let result = match response {
            Ok(r) if r.ok => Ok(r.bytes),
            Ok(r) => {
                warn!("image fetch {url} rejected: {}", r.status);
                Err(format!("server returned {}", r.status))
            }
            Err(e) => {
                warn!("image fetch {url} failed: {e}");
                Err(e)
            }
        };
        let _ = tx.send(NetEvent::ImageFetched { image_id, result });
    });
}

/// Whether a catalog `image_url` should be fetched over HTTP rather than
/// read from the local filesystem.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
