use std::path::Path;

use regex::Regex;

use crate::record::STATUS_PROPOSED;

pub const UNASSIGNED_ID: &str = "XXXX";
pub const RECORD_EXTENSION: &str = "md";
pub const TEMPLATE_FILENAME: &str = "template.md";
pub const TOC_FILENAME: &str = "index.md";
pub const RESERVED_FILENAMES: [&str; 2] = [TEMPLATE_FILENAME, TOC_FILENAME];

const ID_PATTERN: &str = "[0-9]{4}";
const SLUG_PATTERN: &str = "[a-z0-9-]*";

/// Which id portion a filename may carry, derived from the record's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameClass {
    Any,
    Proposed,
    Reviewed,
}

impl FilenameClass {
    pub fn for_status(status: &str) -> Self {
        if status == STATUS_PROPOSED {
            FilenameClass::Proposed
        } else {
            FilenameClass::Reviewed
        }
    }

    fn id_pattern(self) -> String {
        match self {
            FilenameClass::Any => format!("({}|{})", UNASSIGNED_ID, ID_PATTERN),
            FilenameClass::Proposed => UNASSIGNED_ID.to_string(),
            FilenameClass::Reviewed => ID_PATTERN.to_string(),
        }
    }

    fn expected_prefix(self) -> &'static str {
        match self {
            FilenameClass::Any => "XXXX-' or '[0-9][0-9][0-9][0-9]-",
            FilenameClass::Proposed => "XXXX-",
            FilenameClass::Reviewed => "[0-9][0-9][0-9][0-9]-",
        }
    }

    fn label(self) -> &'static str {
        match self {
            FilenameClass::Any => "<any>",
            FilenameClass::Proposed => "<any status without any id yet>",
            FilenameClass::Reviewed => "<any status with an id>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameIssue {
    /// The id portion (or overall shape) does not match what the status allows.
    Format { filename: String, class: FilenameClass },
    /// The slug portion differs from the slug of the title inside the file.
    SlugMismatch {
        filename: String,
        expected_slug: String,
    },
}

impl FilenameIssue {
    pub fn message(&self) -> String {
        match self {
            FilenameIssue::Format { filename, class } => format!(
                "'{}': filename does not follow the format '{}<adr-title-in-slug-format>.md' (status to verify against: '{}')",
                filename,
                class.expected_prefix(),
                class.label()
            ),
            FilenameIssue::SlugMismatch {
                filename,
                expected_slug,
            } => format!(
                "'{}': title portion of the filename does not match the title in the file (expected slug '{}')",
                filename, expected_slug
            ),
        }
    }
}

/// Lowercase ASCII, one hyphen between words, no leading or trailing hyphen.
pub fn slugify(title: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in title.chars().flat_map(fold_char) {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

fn fold_char(ch: char) -> Vec<char> {
    if ch.is_ascii() {
        return vec![ch];
    }
    let folded: &str = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ğ' => "g",
        'Ğ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'İ' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' | 'ş' => "s",
        'Ś' | 'Š' | 'Ş' => "S",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'Ť' | 'Ţ' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        _ => " ",
    };
    folded.chars().collect()
}

pub fn title_lowercase(title: &str) -> String {
    title.to_lowercase()
}

pub fn filename_for(id: &str, title: &str) -> String {
    format!("{}-{}.{}", id, slugify(title), RECORD_EXTENSION)
}

/// Splits `<id>-<slug>.md` into its id and slug portions.
pub fn split_filename(name: &str) -> Option<(&str, &str)> {
    let stem = name.strip_suffix(".md")?;
    let (id, slug) = stem.split_once('-')?;
    if id == UNASSIGNED_ID || (id.len() == 4 && id.chars().all(|c| c.is_ascii_digit())) {
        Some((id, slug))
    } else {
        None
    }
}

pub fn is_reserved(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| RESERVED_FILENAMES.contains(&name))
        .unwrap_or(false)
}

pub fn is_numbered(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 5 && bytes[..4].iter().all(|b| b.is_ascii_digit()) && bytes[4] == b'-'
}

pub fn is_unassigned(name: &str) -> bool {
    name.starts_with("XXXX-")
}

/// Checks the id portion only; the title portion may be anything.
pub fn check_id_format(filename: &str, class: FilenameClass) -> bool {
    let re = Regex::new(&format!(r"^{}-.*\.md$", class.id_pattern())).expect("regex");
    re.is_match(filename)
}

/// Checks the id portion and that the title portion is slug-shaped.
pub fn check_full_format(filename: &str, class: FilenameClass) -> bool {
    let re = Regex::new(&format!(r"^{}-{}\.md$", class.id_pattern(), SLUG_PATTERN))
        .expect("regex");
    re.is_match(filename)
}

pub fn check_slug(filename: &str, title: &str) -> bool {
    split_filename(filename)
        .map(|(_, slug)| slug == slugify(title))
        .unwrap_or(false)
}

/// Both problems are reported when both are present.
pub fn validate_filename(path: &Path, status: &str, title: &str) -> Vec<FilenameIssue> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
        .to_string();
    let class = FilenameClass::for_status(status);
    let mut issues = Vec::new();
    if !check_full_format(&filename, class) {
        issues.push(FilenameIssue::Format {
            filename: filename.clone(),
            class,
        });
    }
    if !check_slug(&filename, title) {
        issues.push(FilenameIssue::SlugMismatch {
            filename,
            expected_slug: slugify(title),
        });
    }
    issues
}
