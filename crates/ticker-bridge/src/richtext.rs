//! 해시태그 및 URL 추출.
//!
//! 반환되는 오프셋은 UTF-8 바이트 기준 `[start, end)`이며
//! `&text[start..end]`는 항상 추출된 토큰과 같습니다.

use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[s]?://([A-Za-z0-9]|[$-_@.&+]|[!*(),]|%[0-9a-fA-F]{2})+")
        .expect("URL pattern is valid")
});

/// 텍스트 안의 토큰과 바이트 범위.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    pub value: String,
}

/// 공백으로 구분된 토큰 중 첫 바이트가 `#`인 것을 추출합니다 (`#` 포함).
///
/// `#` 한 글자만 있는 토큰도 그대로 반환합니다.
pub fn extract_hashtags(text: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut token_start: Option<usize> = None;

    let mut push = |start: usize, end: usize| {
        let token = &text[start..end];
        if token.starts_with('#') {
            spans.push(TextSpan {
                start,
                end,
                value: token.to_string(),
            });
        }
    };

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = token_start.take() {
                push(start, idx);
            }
        } else if token_start.is_none() {
            token_start = Some(idx);
        }
    }
    if let Some(start) = token_start {
        push(start, text.len());
    }

    spans
}

pub fn extract_urls(text: &str) -> Vec<TextSpan> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| TextSpan {
            start: m.start(),
            end: m.end(),
            value: m.as_str().to_string(),
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn hashtag_offsets_slice_text(text in "[a-zA-Z0-9 #\t\nüé😀]{0,64}") {
            for span in extract_hashtags(&text) {
                prop_assert_eq!(text.get(span.start..span.end), Some(span.value.as_str()));
                prop_assert!(span.value.starts_with('#'));
            }
        }

        #[test]
        fn url_offsets_slice_text(text in "(https?://[a-z./?=#é]{0,16}| |[a-z]{0,4}){0,8}") {
            for span in extract_urls(&text) {
                prop_assert_eq!(text.get(span.start..span.end), Some(span.value.as_str()));
            }
        }
    }
}
