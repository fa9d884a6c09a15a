//! Translation key derivation from UI text.

use std::collections::HashMap;
use std::sync::OnceLock;
use regex::Regex;

const MAX_KEY_CHARS: usize = 50;

/// Words that mark a string as a reusable `common.*` entry
const COMMON_WORDS: &[&str] = &[
    "conectar", "desconectar", "escanear", "guardar", "cancelar",
    "aceptar", "continuar", "sí", "no", "error", "éxito", "advertencia",
    "información", "cargando", "completado", "fallido", "activo", "inactivo",
];

fn alert_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[✅❌💾\n${}()]").expect("valid regex"))
}

/// Anything but letters, digits, `_` and whitespace; `\w` alone would keep
/// combining marks such as U+FE0F and U+0301
fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_\s]").expect("valid regex"))
}

fn combining_marks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{M}").expect("valid regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[¿¡?!.,;:()\-]").expect("valid regex"))
}

/// Key used for alert titles and messages, e.g. `"❌ Error de conexión"` -> `"error_de_conexión"`
pub fn text_to_key(text: &str) -> String {
    let text = alert_noise().replace_all(text, "");
    let text = text.to_lowercase();
    let text = non_word().replace_all(&text, "");
    let text = whitespace().replace_all(&text, "_");
    let truncated: String = text.chars().take(MAX_KEY_CHARS).collect();
    truncated.trim_matches('_').to_string()
}

/// ASCII-folded key used for extracted hardcoded strings
pub fn normalize_key(text: &str) -> String {
    let key = combining_marks().replace_all(&text.to_lowercase(), "").into_owned();
    let key = punctuation().replace_all(&key, "").into_owned();
    let key = whitespace().replace_all(&key, "_");
    key.chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .take(MAX_KEY_CHARS)
        .collect()
}

/// Locale section a source file's strings belong to
pub fn categorize_by_file(path: &str) -> &'static str {
    if path.contains("settings") {
        "settings"
    } else if path.contains("toolbox") {
        "toolbox"
    } else if path.contains("auto-spoof") || path.contains("usb") {
        "usb"
    } else if path.contains("fec") {
        "fec"
    } else if path.contains("commands") || path.contains("macros") {
        "commands"
    } else if path.contains("recovery") || path.contains("backup") {
        "recovery"
    } else if path.contains("diag") {
        "diag"
    } else if path.contains("index.tsx") {
        "home"
    } else {
        "common"
    }
}

/// Whether a string contains one of the shared UI words
pub fn is_common_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMMON_WORDS.iter().any(|word| lower.contains(word))
}

/// Hands out unique keys per category, suffixing repeats with `_1`, `_2`, ...
#[derive(Debug, Default)]
pub struct KeyAllocator {
    seen: HashMap<String, usize>,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, category: &str, base_key: &str) -> String {
        let counter = self.seen.entry(format!("{}.{}", category, base_key)).or_insert(0);
        let key = if *counter > 0 {
            format!("{}_{}", base_key, counter)
        } else {
            base_key.to_string()
        };
        *counter += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_to_key_strips_emoji_and_punctuation() {
        assert_eq!(text_to_key("✅ Logs Exportados"), "logs_exportados");
        assert_eq!(text_to_key("💾 Creando Backup"), "creando_backup");
        assert_eq!(text_to_key("Código Inválido"), "código_inválido");
        assert_eq!(
            text_to_key("El dispositivo USB se desconectó correctamente."),
            "el_dispositivo_usb_se_desconectó_correctamente"
        );
    }

    #[test]
    fn text_to_key_drops_combining_marks() {
        assert_eq!(text_to_key("⚠️ Advertencia"), "advertencia");
        assert_eq!(text_to_key("⚠️ Perfil inválido"), "perfil_inválido");
        // decomposed accents fold to the base letter
        assert_eq!(text_to_key("Conexión e\u{301}xito"), "conexión_exito");
        assert_eq!(normalize_key("Atencio\u{301}n"), "atencion");
    }

    #[test]
    fn text_to_key_truncates_then_trims() {
        assert_eq!(text_to_key(&"ñ".repeat(60)).chars().count(), 50);
        assert_eq!(
            text_to_key("Selecciona al menos un código FEC para generar la lista completa"),
            "selecciona_al_menos_un_código_fec_para_generar_la"
        );

        // the 50th char is the separator, so trimming shortens the key
        let key = text_to_key(&format!("{} tail", "a".repeat(49)));
        assert_eq!(key, "a".repeat(49));
    }

    #[test]
    fn text_to_key_drops_newlines_and_templates() {
        assert_eq!(text_to_key("Error:\n${error}"), "errorerror");
    }

    #[test]
    fn normalize_key_folds_accents() {
        assert_eq!(normalize_key("¿Conexión fallida?"), "conexion_fallida");
        assert_eq!(normalize_key("Año de fabricación"), "ano_de_fabricacion");
    }

    #[test]
    fn categories_follow_file_names() {
        assert_eq!(categorize_by_file("app/(tabs)/settings.tsx"), "settings");
        assert_eq!(categorize_by_file("app/(tabs)/auto-spoof.tsx"), "usb");
        assert_eq!(categorize_by_file("app/(tabs)/usb-diag.tsx"), "usb");
        assert_eq!(categorize_by_file("app/(tabs)/backups.tsx"), "recovery");
        assert_eq!(categorize_by_file("app/(tabs)/advanced-diag.tsx"), "diag");
        assert_eq!(categorize_by_file("app/(tabs)/index.tsx"), "home");
        assert_eq!(categorize_by_file("components/toast.tsx"), "common");
    }

    #[test]
    fn allocator_suffixes_repeats_per_category() {
        let mut keys = KeyAllocator::new();
        assert_eq!(keys.allocate("usb", "conectar"), "conectar");
        assert_eq!(keys.allocate("usb", "conectar"), "conectar_1");
        assert_eq!(keys.allocate("fec", "conectar"), "conectar");
        assert_eq!(keys.allocate("usb", "conectar"), "conectar_2");
    }

    #[test]
    fn common_text_detection() {
        assert!(is_common_text("Guardar cambios"));
        assert!(!is_common_text("Perfil VID/PID"));
    }
}
