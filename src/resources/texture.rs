use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{ImageFormat, load_from_memory_with_format};

use crate::data_structures::material::{EnvironmentMap, ImageData, Mapping, TextureHandle};

#[cfg(target_arch = "wasm32")]
fn format_url(root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no global window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("cannot read the page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

/**
 * Reads a file below the asset root and reports the fraction of bytes read so far.
 *
 * Natively `root` is a directory, relative to the working directory unless
 * absolute. On the web it is a path below the page origin.
 */
pub async fn load_binary_with_progress(
    root: &str,
    file_name: &str,
    mut on_progress: impl FnMut(f32),
) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(root, file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        let data = response.bytes().await?.to_vec();
        on_progress(1.0);
        data
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        use tokio::io::AsyncReadExt;

        const CHUNK: usize = 64 * 1024;
        let path = std::path::Path::new(root).join(file_name);
        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("cannot open {}", path.display()))?;
        let total = file.metadata().await?.len() as usize;
        let mut data = Vec::with_capacity(total);
        let mut chunk = vec![0u8; CHUNK];
        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            if total > 0 {
                on_progress((data.len() as f32 / total as f32).min(1.0));
            }
        }
        if total == 0 {
            on_progress(1.0);
        }
        data
    };

    Ok(data)
}

pub async fn load_binary(root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    load_binary_with_progress(root, file_name, |_| ()).await
}

/// Decodes a `data:` URI. Returns `None` if `uri` is not one.
pub fn decode_data_uri(uri: &str) -> Option<anyhow::Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let result = match rest.split_once(";base64,") {
        Some((_, payload)) => BASE64
            .decode(payload)
            .context("invalid base64 payload in data URI"),
        None => Err(anyhow::anyhow!("only base64 encoded data URIs are supported")),
    };
    Some(result)
}

/// Resolves `uri` relative to the directory of the file that references it.
pub fn resolve_relative(base_file: &str, uri: &str) -> String {
    match base_file.rfind('/') {
        Some(idx) => format!("{}/{}", &base_file[..idx], uri),
        None => uri.to_string(),
    }
}

/// Decodes an 8-bit image, optionally using a mime type hint such as `image/png`.
pub fn decode_image(bytes: &[u8], label: &str, mime_type: Option<&str>) -> anyhow::Result<TextureHandle> {
    let format = mime_type
        .and_then(|mime| mime.split('/').last())
        .and_then(ImageFormat::from_extension);
    let img = match format {
        Some(format) => load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    }
    .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(TextureHandle::new(ImageData {
        label: label.to_string(),
        width,
        height,
        rgba: img.into_raw(),
    }))
}

/// Decodes a Radiance `.hdr` image into an equirectangular environment map.
pub fn decode_hdr(bytes: &[u8], label: &str) -> anyhow::Result<EnvironmentMap> {
    let img = load_from_memory_with_format(bytes, ImageFormat::Hdr)
        .with_context(|| format!("{} is not a valid HDR image", label))?
        .to_rgba32f();
    let (width, height) = img.dimensions();
    Ok(EnvironmentMap {
        label: label.to_string(),
        width,
        height,
        texels: img.into_raw(),
        mapping: Mapping::EquirectangularReflection,
    })
}

pub async fn load_hdr(
    root: &str,
    file_name: &str,
    on_progress: impl FnMut(f32),
) -> anyhow::Result<EnvironmentMap> {
    let data = load_binary_with_progress(root, file_name, on_progress).await?;
    decode_hdr(&data, file_name)
}
