//! Kernel command-line handling.
//!
//! Installer command lines often end in a sentinel (`--` or `---`): what
//! follows it is handed to the installed system instead of the kernel. The
//! scan-filename argument must sit before the sentinel to reach casper's
//! early boot code.

/// Argument telling the installer's early boot where the ISO file lives.
pub const SCAN_FILENAME_KEY: &str = "iso-scan/filename";

/// Tokens separating kernel arguments from pass-through arguments.
pub const SENTINELS: &[&str] = &["--", "---"];

pub fn is_sentinel(token: &str) -> bool {
    SENTINELS.contains(&token)
}

/// The `iso-scan/filename=...` token for an image path.
pub fn scan_argument(iso_path: &str) -> String {
    format!("{}={}", SCAN_FILENAME_KEY, iso_path)
}

/// Characters that cannot appear in an image path on an unquoted GRUB
/// `linux` line without splitting or expanding it.
const UNSAFE_PATH_CHARS: &[char] = &['"', '\'', '$', ';', '\\'];

/// First character of `iso_path` that would break the kernel line, if any.
pub fn unsafe_path_char(iso_path: &str) -> Option<char> {
    iso_path
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || UNSAFE_PATH_CHARS.contains(c))
}

/// Ensure `args` carries the scan-filename argument for `iso_path`.
///
/// - an existing argument with the same value is left alone;
/// - an existing argument with another value (typically `${iso_path}` from a
///   `loopback.cfg`) gets its value replaced in place;
/// - an existing argument after the first sentinel is moved right before it;
/// - otherwise the argument goes right before the first sentinel, or at the
///   end when there is no sentinel.
///
/// Whitespace is normalised to single spaces. Applying this twice gives the
/// same string as applying it once.
pub fn inject_scan_filename(args: &str, iso_path: &str) -> String {
    let wanted = scan_argument(iso_path);
    let mut tokens = tokenize(args, &wanted);

    let prefix = format!("{}=", SCAN_FILENAME_KEY);
    let sentinel = tokens.iter().position(|t| is_sentinel(t));
    let existing = tokens.iter().position(|t| t.starts_with(&prefix));

    match (existing, sentinel) {
        (Some(at), Some(sentinel)) if at > sentinel => {
            tokens.retain(|t| !t.starts_with(&prefix));
            tokens.insert(sentinel, wanted);
        }
        (Some(at), _) => tokens[at] = wanted,
        (None, sentinel) => {
            let at = sentinel.unwrap_or(tokens.len());
            tokens.insert(at, wanted);
        }
    }

    dedup_scan_arguments(&mut tokens, &prefix);
    tokens.join(" ")
}

/// Split on whitespace, keeping a previously injected `wanted` argument in
/// one piece even when the image path itself contains spaces.
fn tokenize(args: &str, wanted: &str) -> Vec<String> {
    let words: Vec<&str> = args.split_whitespace().collect();
    let wanted_words: Vec<&str> = wanted.split_whitespace().collect();

    let mut tokens = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if wanted_words.len() > 1 && words[i..].starts_with(&wanted_words) {
            tokens.push(wanted.to_string());
            i += wanted_words.len();
        } else {
            tokens.push(words[i].to_string());
            i += 1;
        }
    }
    tokens
}

/// Keep only the first scan-filename argument.
fn dedup_scan_arguments(tokens: &mut Vec<String>, prefix: &str) {
    let mut seen = false;
    tokens.retain(|t| {
        if !t.starts_with(prefix) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
}
