//! Fast, unchecked byte helpers used by the parser and the detach path.

/// Decodes an ASCII-decimal byte slice to an integer.
///
/// This performs no validation: non-digit bytes are folded in as if they
/// were digits, per the source's documented contract ("garbage in, garbage
/// out"). Callers must only use this on inputs already bounded by the
/// parser, such as a `Content-Length` header value.
#[inline]
pub fn ascii_decimal_to_i64(digits: &[u8]) -> i64 {
    let mut result: i64 = 0;
    for &b in digits {
        result = result.wrapping_mul(10).wrapping_add((b as i64) - ('0' as i64));
    }
    result
}

/// Case-insensitive ASCII byte-slice comparison.
#[inline]
pub fn eq_ignore_ascii_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| x.eq_ignore_ascii_case(&y))
}

/// Allocates an owned copy of a borrowed byte view.
///
/// Used exclusively by the detach path (§4.5): a handler that calls
/// `detach()` needs its request data to outlive the event-loop turn that
/// produced it, so every view it will read gets copied here.
#[inline]
pub fn copy_to_owned(view: &[u8]) -> Vec<u8> {
    view.to_vec()
}

/// Returns the `n`th `/`-separated segment of `path` (0-indexed, counted
/// after the leading slash is stripped), or an empty slice if `path` has
/// fewer than `n + 1` segments. The root path (empty or `"/"`) has zero
/// segments.
#[inline]
pub fn nth_path_segment(path: &[u8], n: usize) -> &[u8] {
    if path.len() <= 1 {
        return &[];
    }
    path[1..].split(|&b| b == b'/').nth(n).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_decimal() {
        assert_eq!(ascii_decimal_to_i64(b"0"), 0);
        assert_eq!(ascii_decimal_to_i64(b"50"), 50);
        assert_eq!(ascii_decimal_to_i64(b"12345"), 12345);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(ascii_decimal_to_i64(b""), 0);
    }

    #[test]
    fn case_insensitive_eq() {
        assert!(eq_ignore_ascii_case(b"Content-Length", b"content-length"));
        assert!(eq_ignore_ascii_case(b"HOST", b"host"));
        assert!(!eq_ignore_ascii_case(b"Host", b"Hosts"));
    }

    #[test]
    fn copy_is_independent() {
        let original = vec![1u8, 2, 3];
        let copy = copy_to_owned(&original);
        assert_eq!(copy, original);
        assert_ne!(copy.as_ptr(), original.as_ptr());
    }

    #[test]
    fn segment_access_by_index() {
        assert_eq!(nth_path_segment(b"/greet/world", 0), b"greet");
        assert_eq!(nth_path_segment(b"/greet/world", 1), b"world");
        assert_eq!(nth_path_segment(b"/greet/world", 2), b"");
    }

    #[test]
    fn root_path_has_no_segments() {
        assert_eq!(nth_path_segment(b"/", 0), b"");
        assert_eq!(nth_path_segment(b"", 0), b"");
    }
}
