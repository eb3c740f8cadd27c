/// Result of validating a flat filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename is longer than 255 bytes.
    TooLong,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename is `..`.
    PathTraversal,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (NUL, CR, LF, etc.).
    ControlCharacter,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "fileName cannot be empty",
            Self::TooLong => "fileName must be at most 255 bytes",
            Self::ContainsPathSeparator => "Invalid fileName: path separators are not allowed",
            Self::PathTraversal => "Invalid fileName: '..' is not allowed",
            Self::Hidden => "Invalid fileName: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid fileName: control characters are not allowed",
        }
    }
}

/// Validates a flat filename (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.len() > 255 {
        return Err(FilenameError::TooLong);
    }

    // Also rules out NUL and CRLF, which would otherwise reach headers.
    if trimmed.chars().any(char::is_control) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Validates a declared MIME type of the form `type/subtype[; params]`.
pub fn validate_content_type(content_type: &str) -> Result<&str, &'static str> {
    let trimmed = content_type.trim();
    if trimmed.is_empty() {
        return Err("fileType cannot be empty");
    }
    if trimmed.len() > 255 || trimmed.chars().any(|c| c.is_control() || !c.is_ascii()) {
        return Err("Invalid fileType");
    }
    let essence = trimmed.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((kind, subtype))
            if !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !essence.contains(char::is_whitespace) =>
        {
            Ok(trimmed)
        }
        _ => Err("fileType must look like 'type/subtype'"),
    }
}

/// Reduces a product name to characters safe inside a quoted header value.
///
/// Keeps ASCII letters, digits, `-`, `_` and spaces. Falls back to
/// `download` when nothing survives.
pub fn safe_download_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect();
    let kept = kept.trim();
    if kept.is_empty() {
        "download".to_string()
    } else {
        kept.to_string()
    }
}

/// `Content-Disposition` for a purchased file named after its product.
///
/// The extension is taken from the stored object key and only kept when
/// it is purely alphanumeric.
pub fn attachment_disposition(product_name: &str, extension: Option<&str>) -> String {
    let stem = safe_download_name(product_name);
    match extension.filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric())) {
        Some(ext) => format!("attachment; filename=\"{stem}.{ext}\""),
        None => format!("attachment; filename=\"{stem}\""),
    }
}
