//! Pattern scan for content that should never appear in a text model file.
//!
//! This is a heuristic: it catches common payloads embedded in OBJ
//! comments or 3MF XML, it does not prove a file is harmless.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use super::verdict::ModelFormat;

struct Rule {
    name: &'static str,
    pattern: Regex,
    /// Tag that is legitimate 3MF core vocabulary
    skip_for_3mf: bool,
}

fn rule(name: &'static str, pattern: &str) -> Rule {
    Rule {
        name,
        pattern: Regex::new(pattern).expect("Invalid heuristic regex"),
        skip_for_3mf: false,
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("script_tag", r"(?is-u)<script\b[^>]*>.*?</script>"),
        rule(
            "code_execution",
            r"(?i-u)(?:eval|exec|system|chmod|include|include_once|require|require_once|passthru|shell_exec|proc_open|popen|curl_exec|curl_multi_exec|parse_ini_file|show_source|highlight_file|fopen|fclose|readfile|file_get_contents|file_put_contents|unlink|phpinfo)\s*\(",
        ),
        rule("database_api", r"(?i-u)mysql_|mysqli_|sqlite3|pdo"),
        rule(
            "shell_command",
            r"(?i-u)\b(?:wget|curl|gcc|nc|netcat|ping|telnet|net|ipconfig|ifconfig|nslookup|tracert|traceroute)\s",
        ),
        rule(
            "suspicious_url",
            r#"(?i-u)https?://[^\s"'}<]*[^a-zA-Z0-9,._\-/&?%=:~\s"'}<]"#,
        ),
        rule("nul_byte", r"(?-u)\x00"),
        Rule {
            skip_for_3mf: true,
            ..rule("object_tag", r"(?is-u)<object\b[^>]*>")
        },
        rule("embedded_frame", r"(?is-u)<(?:iframe|embed)\b[^>]*>"),
        rule(
            "meta_refresh",
            r#"(?is-u)<meta\s+[^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*>"#,
        ),
        rule("external_entity", r"(?is-u)<!ENTITY\s+[^>]*SYSTEM"),
        rule("block_comment", r"(?s-u)/\*.*?\*/"),
    ]
});

pub struct HeuristicScanner;

impl HeuristicScanner {
    /// Name of the first rule matching `content`, if any
    pub fn scan(content: &[u8], format: ModelFormat) -> Option<&'static str> {
        if !format.is_text_bearing() {
            return None;
        }
        RULES
            .iter()
            .filter(|r| !(r.skip_for_3mf && format == ModelFormat::ThreeMf))
            .find(|r| r.pattern.is_match(content))
            .map(|r| r.name)
    }
}
