//! Static wireframe catalog and keyword selection.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use tracing::{debug, warn};

use flow_core::Wireframe;

/// A stock wireframe image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub file: &'static str,
    /// Keywords that select this entry. `None` means always selected.
    pub keywords: Option<&'static str>,
}

pub static CATALOG: [CatalogEntry; 4] = [
    CatalogEntry {
        id: "wf1",
        name: "Home",
        description: "Main landing page with hero section and features",
        file: "home.png",
        keywords: None,
    },
    CatalogEntry {
        id: "wf2",
        name: "Dashboard",
        description: "User dashboard with analytics and widgets",
        file: "dashboard.png",
        keywords: Some("dashboard|admin|analytics|data|metrics"),
    },
    CatalogEntry {
        id: "wf3",
        name: "About",
        description: "About page with company information",
        file: "about.png",
        keywords: Some("about|company|team|info|us"),
    },
    CatalogEntry {
        id: "wf4",
        name: "Contact",
        description: "Contact page with form and details",
        file: "contact.png",
        keywords: Some("contact|form|reach|support|help"),
    },
];

/// Picks stock wireframes for a prompt and loads their images.
#[derive(Debug, Clone, Default)]
pub struct WireframeCatalog {
    assets_dir: Option<PathBuf>,
}

impl WireframeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `home.png`, `dashboard.png`, ...
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    /// Entries matching `prompt`, Home first.
    ///
    /// Keywords are matched as substrings of the lower-cased prompt. When
    /// only Home matches, one other entry is drawn from `rng`, so the result
    /// always has at least two wireframes.
    pub fn select_entries<R: Rng + ?Sized>(&self, prompt: &str, rng: &mut R) -> Vec<&'static CatalogEntry> {
        let prompt = prompt.to_lowercase();
        let mut selected: Vec<&'static CatalogEntry> = Vec::new();

        for entry in CATALOG.iter() {
            match entry.keywords {
                None => selected.push(entry),
                Some(pattern) => {
                    if let Ok(re) = Regex::new(pattern) {
                        if re.is_match(&prompt) {
                            selected.push(entry);
                        }
                    }
                }
            }
        }

        if selected.len() == 1 {
            let remaining: Vec<&'static CatalogEntry> =
                CATALOG.iter().filter(|e| !selected.contains(e)).collect();
            if let Some(extra) = remaining.choose(rng) {
                selected.push(*extra);
            }
        }

        debug!(
            "Selected wireframes: {}",
            selected.iter().map(|e| e.name).collect::<Vec<_>>().join(", ")
        );
        selected
    }

    /// Selected wireframes with image data attached.
    pub fn select<R: Rng + ?Sized>(&self, prompt: &str, rng: &mut R) -> Vec<Wireframe> {
        self.select_entries(prompt, rng)
            .into_iter()
            .map(|entry| self.load(entry))
            .collect()
    }

    /// Wireframe for `entry` with a PNG data URL, or an SVG placeholder
    /// when the image cannot be read.
    pub fn load(&self, entry: &CatalogEntry) -> Wireframe {
        let data = match self.read_png(entry) {
            Some(bytes) => format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
            None => placeholder_svg(entry.name),
        };
        Wireframe::new(entry.id, entry.name, entry.description).with_data(data)
    }

    fn read_png(&self, entry: &CatalogEntry) -> Option<Vec<u8>> {
        let dir = self.assets_dir.as_ref()?;
        let path = dir.join(entry.file);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Could not read wireframe {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// 800x600 grey SVG labelled "{name} - Placeholder", as a base64 data URL.
pub fn placeholder_svg(name: &str) -> String {
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="600">"#,
            r##"<rect width="100%" height="100%" fill="#f0f0f0"/>"##,
            r##"<text x="50%" y="50%" font-family="Arial" font-size="20" text-anchor="middle" fill="#666">"##,
            "{} - Placeholder</text></svg>"
        ),
        escape_xml(name)
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn names(entries: &[&CatalogEntry]) -> Vec<&'static str> {
        entries.iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_keyword_selection() {
        let catalog = WireframeCatalog::new();
        let mut rng = StdRng::seed_from_u64(1);

        let picked = catalog.select_entries("An ADMIN dashboard with a contact form", &mut rng);
        assert_eq!(names(&picked), vec!["Home", "Dashboard", "Contact"]);

        // "us" matches inside words such as "focus".
        let picked = catalog.select_entries("focus timer", &mut rng);
        assert_eq!(names(&picked), vec!["Home", "About"]);
    }

    #[test]
    fn test_home_only_gets_one_extra() {
        let catalog = WireframeCatalog::new();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = catalog.select_entries("a pomodoro timer", &mut rng);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].name, "Home");
        assert_ne!(picked[1].name, "Home");
    }

    #[test]
    fn test_png_and_placeholder_data() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("home.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let catalog = WireframeCatalog::new().with_assets_dir(dir.path());

        let home = catalog.load(&CATALOG[0]);
        assert_eq!(home.data.as_deref(), Some("data:image/png;base64,iVBORw=="));

        let about = catalog.load(&CATALOG[2]);
        let data = about.data.unwrap();
        let payload = data.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("About - Placeholder"));
    }
}
