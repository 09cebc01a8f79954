use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Reply languages the bot can be configured to. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Pt,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Pt];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Pt => "pt",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Pt => "Português",
        }
    }

    /// Discord locale tags this language should be advertised under when
    /// registering localized command names.
    pub fn discord_tags(self) -> &'static [&'static str] {
        match self {
            Locale::En => &["en-US", "en-GB"],
            Locale::Pt => &["pt-BR"],
        }
    }

    /// Accepts both language codes and natural-language names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" | "ingles" | "inglês" => Some(Locale::En),
            "pt" | "pt-br" | "pt-pt" | "portuguese" | "portugues" | "português" => {
                Some(Locale::Pt)
            }
            _ => None,
        }
    }

    pub fn accepted_names() -> String {
        Self::ALL
            .iter()
            .map(|l| format!("`{}` ({})", l.code(), l.display_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Localized reply catalogs, one JSON file per (language, cog).
///
/// File layout: `<dir>/<lang>/<cog>.json`, each file a map of
/// `command -> kind -> key -> template`, plus an optional `meta` block per
/// command carrying localized command names and descriptions.
pub struct Translations {
    dir: PathBuf,
    default_locale: Locale,
    catalogs: RwLock<HashMap<(Locale, String), Value>>,
}

impl Translations {
    pub async fn load(dir: impl Into<PathBuf>, default_locale: Locale) -> Result<Self> {
        let translations = Self {
            dir: dir.into(),
            default_locale,
            catalogs: RwLock::new(HashMap::new()),
        };
        translations.reload().await?;
        Ok(translations)
    }

    /// Re-reads every catalog from disk. Used by the owner reload command.
    pub async fn reload(&self) -> Result<usize> {
        let mut catalogs = HashMap::new();

        for locale in Locale::ALL {
            let lang_dir = self.dir.join(locale.code());
            if !lang_dir.is_dir() {
                warn!("No translation directory for {}", locale.code());
                continue;
            }

            let mut entries = tokio::fs::read_dir(&lang_dir).await.with_context(|| {
                format!("failed to read translation directory {}", lang_dir.display())
            })?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let Some(cog) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };

                let raw = tokio::fs::read_to_string(&path).await?;
                let parsed: Value = serde_json::from_str(&raw)
                    .with_context(|| format!("invalid translation file {}", path.display()))?;
                catalogs.insert((locale, cog.to_string()), parsed);
            }
        }

        let count = catalogs.len();
        *self.catalogs.write().await = catalogs;
        info!("Loaded {count} translation catalogs");
        Ok(count)
    }

    async fn get(
        &self,
        locale: Locale,
        cog: &str,
        command: &str,
        kind: &str,
        key: &str,
    ) -> Option<String> {
        let catalogs = self.catalogs.read().await;
        catalogs
            .get(&(locale, cog.to_string()))?
            .get(command)?
            .get(kind)?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }

    /// Looks a key up in `locale`, falling back to the default language and
    /// finally to the key path itself. Never fails.
    pub async fn tr(
        &self,
        locale: Locale,
        cog: &str,
        command: &str,
        kind: &str,
        key: &str,
        args: &[(&str, String)],
    ) -> String {
        let template = match self.get(locale, cog, command, kind, key).await {
            Some(t) => t,
            None => match self.get(self.default_locale, cog, command, kind, key).await {
                Some(t) => t,
                None => {
                    warn!("Missing translation {cog}.{command}.{kind}.{key}");
                    return format!("{cog}.{command}.{kind}.{key}");
                }
            },
        };
        interpolate(&template, args)
    }

    /// Fills poise's name/description localization tables from the catalogs'
    /// `meta` blocks. Must run before command registration.
    pub async fn localize_commands<U, E>(&self, commands: &mut [poise::Command<U, E>]) {
        let catalogs = self.catalogs.read().await;
        for command in commands {
            let cog = command
                .category
                .as_deref()
                .unwrap_or("misc")
                .to_lowercase();
            localize_command(&catalogs, &cog, command, "");
        }
    }
}

fn localize_command<U, E>(
    catalogs: &HashMap<(Locale, String), Value>,
    cog: &str,
    command: &mut poise::Command<U, E>,
    parent: &str,
) {
    let path = if parent.is_empty() {
        command.name.clone()
    } else {
        format!("{parent}_{}", command.name)
    };

    for locale in Locale::ALL {
        let Some(meta) = catalogs
            .get(&(locale, cog.to_string()))
            .and_then(|c| c.get(&path))
            .and_then(|c| c.get("meta"))
        else {
            continue;
        };

        if let Some(name) = meta.get("name").and_then(Value::as_str) {
            for tag in locale.discord_tags() {
                command
                    .name_localizations
                    .insert(tag.to_string(), name.to_string());
            }
        }
        if let Some(description) = meta.get("description").and_then(Value::as_str) {
            for tag in locale.discord_tags() {
                command
                    .description_localizations
                    .insert(tag.to_string(), description.to_string());
            }
        }
    }

    for sub in &mut command.subcommands {
        localize_command(catalogs, cog, sub, &path);
    }
}

/// `{name}` placeholder substitution. Unknown placeholders are left as-is.
pub fn interpolate(template: &str, args: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parse_accepts_codes_and_names() {
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("English"), Some(Locale::En));
        assert_eq!(Locale::parse("inglês"), Some(Locale::En));
        assert_eq!(Locale::parse("pt"), Some(Locale::Pt));
        assert_eq!(Locale::parse("Português"), Some(Locale::Pt));
        assert_eq!(Locale::parse("klingon"), None);
    }

    #[test]
    fn interpolate_replaces_named_placeholders() {
        assert_eq!(
            interpolate(
                "Prefix changed to {prefix}",
                &[("prefix", "?".to_string())]
            ),
            "Prefix changed to ?"
        );
        assert_eq!(interpolate("no placeholders", &[]), "no placeholders");
        assert_eq!(
            interpolate("{a} and {missing}", &[("a", "x".to_string())]),
            "x and {missing}"
        );
    }
}
