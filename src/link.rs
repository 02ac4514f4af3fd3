use crate::config::Settings;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

// Field names mirror the setup links produced by earlier builds, so existing
// shared links keep decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareRecord {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl ShareRecord {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        }
    }
}

pub fn encode_share_link(page_url: &str, settings: &Settings) -> String {
    let record = ShareRecord::from_settings(settings);
    let json = serde_json::to_string(&record).unwrap_or_default();
    let token = URL_SAFE_NO_PAD.encode(json);
    format!("{}#cfg={token}", strip_page(page_url))
}

pub fn decode_share_link(input: &str) -> Option<ShareRecord> {
    let fragment = match input.find('#') {
        Some(index) => &input[index + 1..],
        None => input,
    };
    let token = fragment
        .split('&')
        .find_map(|param| param.strip_prefix("cfg="))?;
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(index) => &url[..index],
        None => url,
    }
}

fn strip_page(url: &str) -> &str {
    let without_fragment = strip_fragment(url);
    match without_fragment.find('?') {
        Some(index) => &without_fragment[..index],
        None => without_fragment,
    }
}

// Decoded links patch settings field by field; a blank field keeps whatever
// is already configured.
pub fn apply_share_patch(settings: &mut Settings, record: ShareRecord) {
    if !record.base_url.trim().is_empty() {
        settings.base_url = record.base_url;
    }
    if !record.model.trim().is_empty() {
        settings.model = record.model;
    }
    if !record.api_key.trim().is_empty() {
        settings.api_key = record.api_key;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_share_patch, decode_share_link, encode_share_link, strip_fragment, ShareRecord,
    };
    use crate::config::Settings;

    fn settings(base_url: &str, model: &str, api_key: &str) -> Settings {
        Settings {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn share_link_round_trips_settings() {
        let original = settings("https://api.openai.com/v1", "gpt-4o-mini", "sk-abc+/=123");
        let link = encode_share_link("https://gradus.app/setup", &original);
        let record = decode_share_link(&link).expect("encoded link should decode");
        assert_eq!(record, ShareRecord::from_settings(&original));
    }

    #[test]
    fn share_link_round_trips_unicode_and_empty_fields() {
        let original = settings("https://例え.jp/v1", "", "clé-ключ=+/");
        let link = encode_share_link("https://gradus.app/setup", &original);
        let record = decode_share_link(&link).expect("unicode link should decode");
        assert_eq!(record.base_url, "https://例え.jp/v1");
        assert_eq!(record.model, "");
        assert_eq!(record.api_key, "clé-ключ=+/");
    }

    #[test]
    fn encode_strips_query_and_old_fragment_from_page_url() {
        let link = encode_share_link(
            "https://gradus.app/setup?utm=1#cfg=stale",
            &settings("http://localhost:8080/v1", "qwen3", ""),
        );
        assert!(link.starts_with("https://gradus.app/setup#cfg="));
        assert!(!link.contains('?'));
        assert!(!link.contains("stale"));
    }

    #[test]
    fn decode_finds_token_among_other_fragment_params() {
        let plain = encode_share_link("https://gradus.app/setup", &settings("http://h/v1", "m", "k"));
        let token = plain
            .split("cfg=")
            .nth(1)
            .expect("encoded link should carry a token");
        let crowded = format!("https://gradus.app/setup#x=1&cfg={token}&y=2");
        let record = decode_share_link(&crowded).expect("token should decode among neighbors");
        assert_eq!(record.base_url, "http://h/v1");
    }

    #[test]
    fn decode_accepts_bare_fragment() {
        let link = encode_share_link("https://gradus.app/setup", &settings("http://h/v1", "m", "k"));
        let fragment = link
            .split('#')
            .nth(1)
            .expect("encoded link should carry a fragment");
        assert!(decode_share_link(fragment).is_some());
    }

    #[test]
    fn decode_rejects_missing_token() {
        assert!(decode_share_link("https://gradus.app/setup#other=1").is_none());
        assert!(decode_share_link("https://gradus.app/setup").is_none());
    }

    #[test]
    fn decode_rejects_bad_alphabet() {
        assert!(decode_share_link("#cfg=not+valid+base64!").is_none());
    }

    #[test]
    fn decode_rejects_non_record_payload() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let not_json = URL_SAFE_NO_PAD.encode("definitely not json");
        assert!(decode_share_link(&format!("#cfg={not_json}")).is_none());

        let wrong_shape = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(decode_share_link(&format!("#cfg={wrong_shape}")).is_none());
    }

    #[test]
    fn strip_fragment_drops_everything_after_hash() {
        assert_eq!(
            strip_fragment("https://gradus.app/setup#cfg=abc"),
            "https://gradus.app/setup"
        );
        assert_eq!(strip_fragment("https://gradus.app/setup"), "https://gradus.app/setup");
    }

    #[test]
    fn patch_keeps_current_values_for_blank_fields() {
        let mut current = settings("http://localhost:8080/v1", "qwen3", "local-key");
        apply_share_patch(
            &mut current,
            ShareRecord {
                base_url: String::new(),
                model: "mistral-small".to_string(),
                api_key: "  ".to_string(),
            },
        );
        assert_eq!(current.base_url, "http://localhost:8080/v1");
        assert_eq!(current.model, "mistral-small");
        assert_eq!(current.api_key, "local-key");
    }
}
