//! Attachment filename handling.
//!
//! The worksheet title is user input and usually Korean; it becomes the
//! download filename. Characters Windows forbids in filenames are replaced,
//! the result is length-capped, and the `Content-Disposition` header uses
//! the RFC 5987 `filename*=UTF-8''…` form so non-ASCII titles survive every
//! browser without mojibake.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters illegal in Windows filenames.
const ILLEGAL: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Longest accepted stem, in characters.
const MAX_LEN: usize = 150;

/// `encodeURIComponent`-equivalent set: everything except ASCII
/// alphanumerics and `- _ . ! ~ * ' ( )` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Replace illegal characters with `_`, trim, cap at 150 characters.
pub fn sanitize(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    replaced.trim().chars().take(MAX_LEN).collect()
}

/// Full `Content-Disposition` value for the packed document.
pub fn content_disposition(title: &str) -> String {
    let filename = format!("{}.docx", sanitize(title));
    format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(&filename, COMPONENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_all_illegal_characters() {
        let s = sanitize(r#"a\b/c:d*e?f"g<h>i|j"#);
        for c in ILLEGAL {
            assert!(!s.contains(c), "found {c:?} in {s:?}");
        }
        assert_eq!(s, "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn trims_and_caps_length() {
        assert_eq!(sanitize("  제목  "), "제목");
        let long = "가".repeat(300);
        assert_eq!(sanitize(&long).chars().count(), 150);
    }

    #[test]
    fn korean_title_is_percent_encoded_losslessly() {
        let header = content_disposition("수학 학습지");
        assert!(header.starts_with("attachment; filename*=UTF-8''"));
        assert!(header.is_ascii());
        // "수" = EC 88 98 in UTF-8.
        assert!(header.contains("%EC%88%98"));
        assert!(header.ends_with(".docx"));
    }

    #[test]
    fn ascii_title_passes_through() {
        assert_eq!(
            content_disposition("week-3_review"),
            "attachment; filename*=UTF-8''week-3_review.docx"
        );
    }
}
