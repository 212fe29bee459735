use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

const SIGNATURE_LEN: usize = 32;

/// Builds frame-extraction URLs for a fetch-style video CDN
#[derive(Debug, Clone)]
pub struct FrameUrlBuilder {
    base_url: String,
    cloud_name: String,
    signing_secret: Option<String>,
}

impl FrameUrlBuilder {
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        signing_secret: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            signing_secret: signing_secret.filter(|s| !s.is_empty()),
        }
    }

    /// `<base>/<cloud>/video/fetch[/s--SIG--]/so_<t>/f_jpg,q_auto/<encoded video url>`
    pub fn frame_url(&self, video_url: &str, timestamp: u32) -> String {
        let to_sign = format!(
            "so_{}/f_jpg,q_auto/{}",
            timestamp,
            urlencoding::encode(video_url)
        );

        match &self.signing_secret {
            Some(secret) => format!(
                "{}/{}/video/fetch/s--{}--/{}",
                self.base_url,
                self.cloud_name,
                sign(&to_sign, secret),
                to_sign
            ),
            None => format!(
                "{}/{}/video/fetch/{}",
                self.base_url, self.cloud_name, to_sign
            ),
        }
    }
}

fn sign(to_sign: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());
    encoded.truncate(SIGNATURE_LEN);
    encoded
}
