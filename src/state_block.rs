use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_STAGES_TOTAL: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressInfo {
    pub current: Option<u32>,
    pub total: u32,
}

impl Default for ProgressInfo {
    fn default() -> Self {
        Self {
            current: None,
            total: DEFAULT_STAGES_TOTAL,
        }
    }
}

fn state_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*STATE\s*:").unwrap())
}

fn progress_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"progress\s*:").unwrap())
}

fn current_stage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"current_stage\s*:\s*(\d+)").unwrap())
}

fn stages_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"stages_total\s*:\s*(\d+)").unwrap())
}

/// Returns the trimmed inner text of the last well-closed fenced region that
/// carries a `STATE:` line, or `None`. Unterminated fences never match.
pub fn extract_state_block(reply: &str) -> Option<String> {
    let mut last_match: Option<String> = None;
    let mut open_fence: Option<(usize, Vec<&str>)> = None;

    for line in reply.lines() {
        match open_fence.as_mut() {
            None => {
                if let Some(count) = fence_open(line) {
                    open_fence = Some((count, Vec::new()));
                }
            }
            Some((count, inner)) => {
                if fence_close(line, *count) {
                    if inner.iter().any(|inner_line| state_marker_re().is_match(inner_line)) {
                        last_match = Some(inner.join("\n").trim().to_string());
                    }
                    open_fence = None;
                } else {
                    inner.push(line);
                }
            }
        }
    }

    last_match
}

fn fence_open(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let count = trimmed.chars().take_while(|&ch| ch == '`').count();
    (count >= 3).then_some(count)
}

fn fence_close(line: &str, open_count: usize) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|ch| ch == '`')
        && trimmed.chars().count() >= open_count
}

/// Best-effort scan of the stage-state text for the `progress:` mapping.
/// Absent input and every malformed shape degrade to the defaults.
pub fn parse_progress(state: Option<&str>) -> ProgressInfo {
    let Some(text) = state else {
        return ProgressInfo::default();
    };
    let Some(segment) = progress_segment(text) else {
        return ProgressInfo::default();
    };

    ProgressInfo {
        current: capture_u32(current_stage_re(), segment),
        total: capture_u32(stages_total_re(), segment).unwrap_or(DEFAULT_STAGES_TOTAL),
    }
}

// The segment ends at the first `}` after the first `{`; a nested mapping
// inside `progress:` would cut the scan short, which is accepted.
fn progress_segment(text: &str) -> Option<&str> {
    let key = progress_key_re().find(text)?;
    let rest = &text[key.end()..];
    let open = rest.find('{')?;
    let after_open = &rest[open + 1..];
    let close = after_open.find('}')?;
    Some(&after_open[..close])
}

fn capture_u32(re: &Regex, segment: &str) -> Option<u32> {
    re.captures(segment)?.get(1)?.as_str().parse().ok()
}
