use anyhow::anyhow;
use viz_core::glb;
use viz_core::overlay::{Pose, PoseMeshes};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

pub fn pose_url(base: &str, pose: Pose) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        pose.file_name()
    } else {
        format!("{}/{}", base, pose.file_name())
    }
}

async fn fetch_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let window = web::window().ok_or_else(|| anyhow!("no window"))?;
    let resp = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| anyhow!("fetch {}: {:?}", url, e))?;
    let resp: web::Response = resp
        .dyn_into()
        .map_err(|e| anyhow!("fetch {}: not a Response: {:?}", url, e))?;
    if !resp.ok() {
        return Err(anyhow!("fetch {}: HTTP {} {}", url, resp.status(), resp.status_text()));
    }
    let buf = resp
        .array_buffer()
        .map_err(|e| anyhow!("{:?}", e))?;
    let buf = JsFuture::from(buf).await.map_err(|e| anyhow!("{:?}", e))?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

/// Fetch and decode the container for `pose`.
pub async fn fetch_pose(base: &str, pose: Pose) -> anyhow::Result<PoseMeshes> {
    let url = pose_url(base, pose);
    log::info!("[loader] fetching {}", url);
    let bytes = fetch_bytes(&url).await?;
    let meshes = glb::parse_glb(&bytes)?;
    log::info!(
        "[loader] {}: {} bytes, {} meshes",
        url,
        bytes.len(),
        meshes.len()
    );
    Ok(PoseMeshes { meshes })
}
