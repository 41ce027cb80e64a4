use thiserror::Error;

/// Largest file the picker accepts, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 1_000_000;
pub const ACCEPTED_MIME: &str = "image/*";

const IMAGE_MIME_PREFIX: &str = "image/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("File type must be {}", ACCEPTED_MIME)]
    InvalidType { mime: String },
    #[error("Please upload a image smaller than 1MB. Current size: {}MB", megabytes(.size))]
    TooLarge { size: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub mime: String,
    pub size: u64,
}

fn megabytes(size: &u64) -> u64 {
    (*size as f64 / 1_000_000.0).round() as u64
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with(IMAGE_MIME_PREFIX) && mime.len() > IMAGE_MIME_PREFIX.len()
}

pub fn validate_file(info: &FileInfo) -> Result<(), FileRejection> {
    if !is_image_mime(&info.mime) {
        return Err(FileRejection::InvalidType {
            mime: info.mime.clone(),
        });
    }
    if info.size > MAX_UPLOAD_BYTES {
        return Err(FileRejection::TooLarge { size: info.size });
    }
    Ok(())
}

/// Splits picked files into accepted ones and rejected ones with their reason.
/// Both lists keep the input order.
pub fn partition_files<T, F>(files: Vec<T>, describe: F) -> (Vec<T>, Vec<(T, FileRejection)>)
where
    F: Fn(&T) -> FileInfo,
{
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for file in files {
        match validate_file(&describe(&file)) {
            Ok(()) => accepted.push(file),
            Err(rejection) => rejected.push((file, rejection)),
        }
    }

    (accepted, rejected)
}

/// The one file to upload from a pick, plus every rejection to report.
/// Only the first accepted file is uploaded; the rest are ignored.
pub fn select_upload<T, F>(files: Vec<T>, describe: F) -> (Option<T>, Vec<(T, FileRejection)>)
where
    F: Fn(&T) -> FileInfo,
{
    let (accepted, rejected) = partition_files(files, describe);
    (accepted.into_iter().next(), rejected)
}

/// Name offered for the downloaded animation: the upload's name with its
/// extension swapped for `.gif`.
pub fn download_file_name(original: &str) -> String {
    if let Some(idx) = original.rfind('.') {
        let suffix = &original[idx + 1..];
        if !suffix.is_empty() && !suffix.contains('/') {
            return format!("{}.gif", &original[..idx]);
        }
    }
    format!("{}.gif", original.trim_end_matches('.'))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("Payload is not a data URL")]
    NotDataUrl,
    #[error("Data URL is not base64 encoded")]
    NotBase64,
    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and payload.
pub fn data_url_payload(data_url: &str) -> Result<(&str, &str), DataUrlError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(DataUrlError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }
    if !is_image_mime(mime) {
        return Err(DataUrlError::UnsupportedType(mime.to_string()));
    }

    Ok((mime, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, mime: &str, size: u64) -> FileInfo {
        FileInfo {
            name: name.into(),
            mime: mime.into(),
            size,
        }
    }

    #[test]
    fn oversized_image_is_rejected_with_size_message() {
        let rejection = validate_file(&info("me.png", "image/png", 2_000_000)).unwrap_err();
        assert_eq!(rejection, FileRejection::TooLarge { size: 2_000_000 });
        assert_eq!(
            rejection.to_string(),
            "Please upload a image smaller than 1MB. Current size: 2MB"
        );
    }

    #[test]
    fn size_message_rounds_to_nearest_megabyte() {
        let rejection = FileRejection::TooLarge { size: 1_400_000 };
        assert!(rejection.to_string().ends_with("Current size: 1MB"));
        let rejection = FileRejection::TooLarge { size: 2_600_000 };
        assert!(rejection.to_string().ends_with("Current size: 3MB"));
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate_file(&info("a.jpg", "image/jpeg", MAX_UPLOAD_BYTES)).is_ok());
        assert!(validate_file(&info("a.jpg", "image/jpeg", MAX_UPLOAD_BYTES + 1)).is_err());
    }

    #[test]
    fn non_image_is_rejected_before_size() {
        let rejection = validate_file(&info("a.pdf", "application/pdf", 5_000_000)).unwrap_err();
        assert_eq!(rejection.to_string(), "File type must be image/*");
        assert!(validate_file(&info("blob", "", 10)).is_err());
        assert!(validate_file(&info("blob", "image/", 10)).is_err());
    }

    #[test]
    fn partition_handles_accepted_and_rejected_independently() {
        let files = vec![
            info("big.png", "image/png", 3_000_000),
            info("ok.png", "image/png", 10),
            info("doc.txt", "text/plain", 10),
            info("ok2.webp", "image/webp", 20),
        ];
        let (accepted, rejected) = partition_files(files, Clone::clone);

        let accepted: Vec<_> = accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(accepted, ["ok.png", "ok2.webp"]);

        let rejected: Vec<_> = rejected.iter().map(|(f, _)| f.name.as_str()).collect();
        assert_eq!(rejected, ["big.png", "doc.txt"]);
    }

    #[test]
    fn rejections_without_accepted_files_are_still_reported() {
        let (accepted, rejected) =
            partition_files(vec![info("big.png", "image/png", 9_000_000)], Clone::clone);
        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn download_name_swaps_extension() {
        assert_eq!(download_file_name("portrait.png"), "portrait.gif");
        assert_eq!(download_file_name("my.photo.jpeg"), "my.photo.gif");
        assert_eq!(download_file_name("noext"), "noext.gif");
        assert_eq!(download_file_name("trailing."), "trailing.gif");
    }

    #[test]
    fn parses_image_data_url() {
        let (mime, payload) = data_url_payload("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(payload, "iVBORw0KGgo=");
    }

    #[test]
    fn rejects_malformed_data_urls() {
        assert_eq!(
            data_url_payload("https://x/img.png"),
            Err(DataUrlError::NotDataUrl)
        );
        assert_eq!(
            data_url_payload("data:image/png,rawbytes"),
            Err(DataUrlError::NotBase64)
        );
        assert_eq!(
            data_url_payload("data:text/plain;base64,aGk="),
            Err(DataUrlError::UnsupportedType("text/plain".into()))
        );
    }

    #[test]
    fn only_first_accepted_file_is_selected() {
        let files = vec![
            info("huge.png", "image/png", 3_000_000),
            info("first.jpg", "image/jpeg", 10),
            info("second.png", "image/png", 20),
        ];
        let (selected, rejected) = select_upload(files, FileInfo::clone);
        assert_eq!(selected.map(|f| f.name), Some("first.jpg".to_string()));
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0.name, "huge.png");
    }

    #[test]
    fn rejected_files_are_never_selected() {
        let files = vec![
            info("notes.txt", "text/plain", 10),
            info("big.gif", "image/gif", 1_000_001),
        ];
        let (selected, rejected) = select_upload(files, FileInfo::clone);
        assert!(selected.is_none());
        assert!(matches!(rejected[0].1, FileRejection::InvalidType { .. }));
        assert!(matches!(rejected[1].1, FileRejection::TooLarge { .. }));
    }
}
