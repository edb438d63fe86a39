//! Form encoding of request parameters and line reassembly of response
//! bodies.

use std::io::{self, BufRead};

use url::form_urlencoded::byte_serialize;

/// Percent-encode a single value as `application/x-www-form-urlencoded`
/// UTF-8 text. Spaces become `+`.
pub fn encode_value(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Join parameters as `key=value` pairs separated by `&`, in insertion order.
///
/// Values are encoded, keys are emitted as given.
pub fn encode_parameters<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key.as_ref());
        out.push('=');
        out.push_str(&encode_value(value.as_ref()));
    }
    out
}

/// Read `reader` line by line and rejoin the lines with `\n`.
///
/// A line ends at `\n`, `\r\n` or a lone `\r`, and the terminator is
/// dropped, so a body ending in a line break comes back without it. Invalid
/// UTF-8 is replaced rather than treated as a failure. On a read error the
/// complete lines collected so far are returned alongside the error.
pub fn join_lines<R: BufRead>(mut reader: R) -> (String, Option<io::Error>) {
    let mut lines = Vec::new();
    let mut line = Vec::new();
    // Set after a `\r` so that an immediately following `\n` is swallowed,
    // even across buffer refills.
    let mut after_cr = false;
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return (lines.join("\n"), Some(err)),
        };
        if buf.is_empty() {
            break;
        }
        let used = buf.len();
        for &byte in buf {
            if std::mem::take(&mut after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' => lines.push(take_line(&mut line)),
                b'\r' => {
                    lines.push(take_line(&mut line));
                    after_cr = true;
                }
                _ => line.push(byte),
            }
        }
        reader.consume(used);
    }
    if !line.is_empty() {
        lines.push(take_line(&mut line));
    }
    (lines.join("\n"), None)
}

fn take_line(line: &mut Vec<u8>) -> String {
    String::from_utf8_lossy(&std::mem::take(line)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_are_escaped() {
        let encoded = encode_value("a b&c=d+e%");
        assert_eq!(encoded, "a+b%26c%3Dd%2Be%25");
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('&'));
        assert!(!encoded.contains('='));
    }

    #[test]
    fn non_ascii_is_utf8_encoded() {
        assert_eq!(encode_value("café"), "caf%C3%A9");
    }

    #[test]
    fn parameters_keep_insertion_order() {
        let pairs = [("name", "Bob"), ("mood", "Happy"), ("age", "42")];
        assert_eq!(encode_parameters(&pairs), "name=Bob&mood=Happy&age=42");
    }

    #[test]
    fn no_leading_ampersand() {
        let pairs = [("only", "one")];
        let encoded = encode_parameters(&pairs);
        assert_eq!(encoded, "only=one");
        assert!(!encoded.starts_with('&'));
    }

    #[test]
    fn empty_parameters_encode_to_empty_string() {
        let pairs: [(&str, &str); 0] = [];
        assert_eq!(encode_parameters(&pairs), "");
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let pairs = [("k", "1"), ("k", "2")];
        assert_eq!(encode_parameters(&pairs), "k=1&k=2");
    }

    #[test]
    fn lines_are_rejoined_without_trailing_newline() {
        let (body, err) = join_lines("Hello\nWorld\n".as_bytes());
        assert_eq!(body, "Hello\nWorld");
        assert!(err.is_none());
    }

    #[test]
    fn crlf_terminators_are_normalised() {
        let (body, _) = join_lines("Hello\r\nWorld\r\n".as_bytes());
        assert_eq!(body, "Hello\nWorld");
    }

    #[test]
    fn lone_cr_terminates_lines() {
        let (body, err) = join_lines("Hello\rWorld\r".as_bytes());
        assert_eq!(body, "Hello\nWorld");
        assert!(err.is_none());
    }

    #[test]
    fn mixed_terminators_are_normalised() {
        let (body, _) = join_lines("a\rb\r\nc\nd".as_bytes());
        assert_eq!(body, "a\nb\nc\nd");
    }

    #[test]
    fn crlf_split_across_refills_counts_once() {
        let reader = io::BufReader::with_capacity(1, "one\r\ntwo\r\n".as_bytes());
        let (body, _) = join_lines(reader);
        assert_eq!(body, "one\ntwo");
    }

    #[test]
    fn only_one_trailing_newline_is_dropped() {
        let (body, _) = join_lines("Hello\n\n".as_bytes());
        assert_eq!(body, "Hello\n");
    }

    #[test]
    fn body_without_final_newline_is_unchanged() {
        let (body, _) = join_lines("Hello\nWorld".as_bytes());
        assert_eq!(body, "Hello\nWorld");
    }

    #[test]
    fn empty_body_stays_empty() {
        let (body, err) = join_lines("".as_bytes());
        assert_eq!(body, "");
        assert!(err.is_none());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let (body, err) = join_lines(&b"ok\n\xff\n"[..]);
        assert_eq!(body, "ok\n\u{fffd}");
        assert!(err.is_none());
    }

    #[test]
    fn read_error_keeps_captured_lines() {
        struct Failing {
            served: bool,
        }
        impl io::Read for Failing {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.served {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
                }
                self.served = true;
                let chunk = b"first\nsecond\n";
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
        }

        let reader = io::BufReader::new(Failing { served: false });
        let (body, err) = join_lines(reader);
        assert_eq!(body, "first\nsecond");
        assert_eq!(err.map(|e| e.kind()), Some(io::ErrorKind::ConnectionReset));
    }
}
