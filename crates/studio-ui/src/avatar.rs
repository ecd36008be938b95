//! Avatar resolution for chat participants.
//!
//! A participant is shown, in order of precedence, as:
//!
//! 1. whatever a caller-supplied custom render returns,
//! 2. the fixed system avatar when the role is `system`,
//! 3. a decorative image picked by hashing the name (when random avatars are
//!    enabled and the image has finished loading),
//! 4. an initials badge.
//!
//! Image loading is asynchronous and keyed by the inputs that triggered it.
//! Changing any input cancels the in-flight load, and a result for an older
//! key is dropped instead of applied.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use studio_settings::UiSettings;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{Result, UiError};

/// File extensions recognized as avatar images.
pub const AVATAR_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "webp"];

/// 32-bit rolling hash of `name` over UTF-16 code units, seeded by `seed`.
///
/// `hash = seed; hash = hash * 31 + unit` with signed wraparound, then the
/// absolute value.
pub fn name_hash(name: &str, seed: i32) -> u32 {
    name.encode_utf16()
        .fold(seed, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}

/// First two UTF-16 code units of the name, uppercased.
///
/// Counted in the same units as [`name_hash`]. A name starting with an
/// astral character yields just that character; a pair split across the
/// boundary becomes U+FFFD.
pub fn initials(name: &str) -> String {
    let units: Vec<u16> = name.encode_utf16().take(2).collect();
    String::from_utf16_lossy(&units).to_uppercase()
}

/// Available avatar images, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvatarCatalog {
    assets: Vec<PathBuf>,
}

impl AvatarCatalog {
    /// Catalog over an explicit asset list.
    pub fn new(assets: Vec<PathBuf>) -> Self {
        Self { assets }
    }

    /// Walk `dir` for image files. The order is whatever the walk yields.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut assets = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && is_avatar_file(entry.path()) {
                assets.push(entry.into_path());
            }
        }
        debug!(dir = %dir.display(), count = assets.len(), "discovered avatar assets");
        Ok(Self { assets })
    }

    /// Catalog for the configured `ui.avatarDir`. An empty setting yields an
    /// empty catalog, so every participant falls back to initials.
    pub fn from_settings(settings: &UiSettings) -> Result<Self> {
        if settings.avatar_dir.is_empty() {
            return Ok(Self::default());
        }
        Self::discover(Path::new(&settings.avatar_dir))
    }

    /// Assets in catalog order.
    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the catalog has no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Asset selected for `(name, seed)`, or `None` for an empty catalog.
    pub fn select(&self, name: &str, seed: i32) -> Option<&Path> {
        if self.assets.is_empty() {
            return None;
        }
        let index = name_hash(name, seed) as usize % self.assets.len();
        self.assets.get(index).map(PathBuf::as_path)
    }

    /// View for `key` when the selected asset is referenced by path instead
    /// of being fetched.
    pub fn view_in_place(&self, key: &AvatarKey, custom: Option<&CustomRender>) -> AvatarView {
        let loaded = if key.random_avatar && !key.is_system() {
            self.select(&key.name, key.seed).map(|path| LoadedAvatar {
                key: key.clone(),
                path: path.to_path_buf(),
                src: path.display().to_string(),
            })
        } else {
            None
        };
        resolve_avatar(key, custom, loaded.as_ref())
    }
}

fn is_avatar_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AVATAR_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Inputs that determine which avatar a participant gets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AvatarKey {
    /// Display name.
    pub name: String,
    /// Participant role.
    pub role: String,
    /// Whether decorative images are enabled.
    pub random_avatar: bool,
    /// Hash seed.
    pub seed: i32,
}

impl AvatarKey {
    /// Build a key.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        random_avatar: bool,
        seed: i32,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            random_avatar,
            seed,
        }
    }

    /// Role is `system`, ignoring case.
    pub fn is_system(&self) -> bool {
        self.role.eq_ignore_ascii_case("system")
    }
}

/// Caller-supplied avatar override. Returning `None` defers to the defaults.
pub type CustomRender = dyn Fn(&AvatarKey) -> Option<String> + Send + Sync;

/// A finished image load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedAvatar {
    /// Inputs the load was started for.
    pub key: AvatarKey,
    /// Catalog asset that was loaded.
    pub path: PathBuf,
    /// Loadable source for the image.
    pub src: String,
}

/// What to draw for a participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AvatarView {
    /// Output of the custom render.
    Custom(String),
    /// The fixed system avatar.
    System,
    /// A loaded decorative image.
    Image {
        /// Loadable source.
        src: String,
    },
    /// Initials badge.
    Initials(String),
}

/// Pick the view for `key` given an optional custom render and the current
/// load result. A load result for a different key is ignored.
pub fn resolve_avatar(
    key: &AvatarKey,
    custom: Option<&CustomRender>,
    loaded: Option<&LoadedAvatar>,
) -> AvatarView {
    if let Some(rendered) = custom.and_then(|render| render(key)) {
        return AvatarView::Custom(rendered);
    }
    if key.is_system() {
        return AvatarView::System;
    }
    match loaded {
        Some(avatar) if key.random_avatar && avatar.key == *key => AvatarView::Image {
            src: avatar.src.clone(),
        },
        _ => AvatarView::Initials(initials(&key.name)),
    }
}

/// Loads avatar assets.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Load `path` and return a source the renderer can display.
    async fn fetch(&self, path: &Path) -> Result<String>;
}

/// Fetcher that serves assets straight from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsAssetFetcher;

#[async_trait]
impl AssetFetcher for FsAssetFetcher {
    async fn fetch(&self, path: &Path) -> Result<String> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| UiError::AssetUnavailable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        if !metadata.is_file() {
            return Err(UiError::AssetUnavailable {
                path: path.display().to_string(),
                message: "not a file".into(),
            });
        }
        Ok(format!("file://{}", path.display()))
    }
}

/// Per-participant avatar state with keyed, cancellable loading.
pub struct AvatarLoader {
    catalog: Arc<AvatarCatalog>,
    fetcher: Arc<dyn AssetFetcher>,
    current: Option<(AvatarKey, CancellationToken)>,
    loaded: Option<LoadedAvatar>,
}

impl AvatarLoader {
    /// Loader drawing from `catalog` through `fetcher`.
    pub fn new(catalog: Arc<AvatarCatalog>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            catalog,
            fetcher,
            current: None,
            loaded: None,
        }
    }

    /// Inputs of the most recent request.
    pub fn key(&self) -> Option<&AvatarKey> {
        self.current.as_ref().map(|(key, _)| key)
    }

    /// Switch to `key`.
    ///
    /// Same key as before: nothing happens. Otherwise the previous load is
    /// cancelled, the previous image is forgotten, and a new load is spawned
    /// if an image applies. Feed the task's output to [`AvatarLoader::apply`].
    pub fn request(&mut self, key: AvatarKey) -> Option<JoinHandle<Option<LoadedAvatar>>> {
        if self.key() == Some(&key) {
            return None;
        }
        if let Some((previous, token)) = self.current.take() {
            token.cancel();
            debug!(name = %previous.name, "cancelled avatar load");
        }
        self.loaded = None;

        let token = CancellationToken::new();
        self.current = Some((key.clone(), token.clone()));

        if !key.random_avatar || key.is_system() {
            return None;
        }
        let path = self.catalog.select(&key.name, key.seed)?.to_path_buf();
        let fetcher = Arc::clone(&self.fetcher);

        Some(tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => None,
                result = fetcher.fetch(&path) => match result {
                    Ok(src) => Some(LoadedAvatar { key, path, src }),
                    Err(e) => {
                        warn!(name = %key.name, error = %e, "avatar load failed");
                        None
                    }
                },
            }
        }))
    }

    /// Apply a finished load. Returns `false` (and drops it) when the inputs
    /// have changed since the load started.
    pub fn apply(&mut self, loaded: LoadedAvatar) -> bool {
        match &self.current {
            Some((key, token)) if *key == loaded.key && !token.is_cancelled() => {
                self.loaded = Some(loaded);
                true
            }
            _ => {
                debug!(name = %loaded.key.name, "dropping stale avatar load");
                false
            }
        }
    }

    /// Currently applied image, if any.
    pub fn loaded(&self) -> Option<&LoadedAvatar> {
        self.loaded.as_ref()
    }

    /// View for the current inputs, or `None` before the first request.
    pub fn view(&self, custom: Option<&CustomRender>) -> Option<AvatarView> {
        self.key()
            .map(|key| resolve_avatar(key, custom, self.loaded.as_ref()))
    }
}

impl Drop for AvatarLoader {
    fn drop(&mut self) {
        if let Some((_, token)) = &self.current {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Never finishes for `slow.png`; everything else loads immediately.
    struct SlowForOne;

    #[async_trait]
    impl AssetFetcher for SlowForOne {
        async fn fetch(&self, path: &Path) -> Result<String> {
            if path.ends_with("slow.png") {
                std::future::pending::<()>().await;
            }
            Ok(format!("mem://{}", path.display()))
        }
    }

    struct Failing;

    #[async_trait]
    impl AssetFetcher for Failing {
        async fn fetch(&self, path: &Path) -> Result<String> {
            Err(UiError::AssetUnavailable {
                path: path.display().to_string(),
                message: "gone".into(),
            })
        }
    }

    struct Immediate;

    #[async_trait]
    impl AssetFetcher for Immediate {
        async fn fetch(&self, path: &Path) -> Result<String> {
            Ok(format!("mem://{}", path.display()))
        }
    }

    fn catalog(names: &[&str]) -> Arc<AvatarCatalog> {
        Arc::new(AvatarCatalog::new(names.iter().map(PathBuf::from).collect()))
    }

    fn key(name: &str) -> AvatarKey {
        AvatarKey::new(name, "assistant", true, 0)
    }

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(name_hash("", 7), 7);
        assert_eq!(name_hash("a", 0), 97);
        assert_eq!(name_hash("ab", 0), 97 * 31 + 98);
        assert_eq!(name_hash("", -5), 5);
        assert_eq!(name_hash("", i32::MIN), 2_147_483_648);
    }

    #[test]
    fn hash_uses_utf16_code_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00
        let expected = 0xD83D_i32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(name_hash("😀", 0), expected.unsigned_abs());
    }

    #[test]
    fn hash_wraps_instead_of_overflowing() {
        let long = "z".repeat(64);
        let _ = name_hash(&long, i32::MAX);
    }

    #[test]
    fn initials_take_two_chars_uppercased() {
        assert_eq!(initials("friday"), "FR");
        assert_eq!(initials("x"), "X");
        assert_eq!(initials(""), "");
        assert_eq!(initials("小明同学"), "小明");
    }

    #[test]
    fn initials_count_utf16_units() {
        assert_eq!(initials("😀bot"), "😀");
        assert_eq!(initials("a😀"), "A\u{FFFD}");
    }

    #[test]
    fn select_on_empty_catalog_is_none() {
        assert!(AvatarCatalog::default().select("anyone", 0).is_none());
    }

    #[test]
    fn select_indexes_by_hash() {
        let catalog = catalog(&["a.png", "b.png", "c.png"]);
        let expected = name_hash("Friday", 3) as usize % 3;
        assert_eq!(
            catalog.select("Friday", 3),
            Some(catalog.assets()[expected].as_path())
        );
    }

    #[test]
    fn discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["a.png", "b.JPG", "nested/c.svg", "notes.txt", "d.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let catalog = AvatarCatalog::discover(dir.path()).unwrap();
        let mut names: Vec<_> = catalog
            .assets()
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        assert_eq!(names, ["a.png", "b.JPG", "c.svg", "d.webp"]);
    }

    #[test]
    fn discover_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AvatarCatalog::discover(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn catalog_from_settings_reads_avatar_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fox.png"), b"x").unwrap();

        let unset = AvatarCatalog::from_settings(&UiSettings::default()).unwrap();
        assert!(unset.is_empty());

        let settings = UiSettings {
            avatar_dir: dir.path().display().to_string(),
            ..UiSettings::default()
        };
        let catalog = AvatarCatalog::from_settings(&settings).unwrap();
        assert_eq!(catalog.len(), 1);

        let missing = UiSettings {
            avatar_dir: dir.path().join("missing").display().to_string(),
            ..UiSettings::default()
        };
        assert!(AvatarCatalog::from_settings(&missing).is_err());
    }

    #[test]
    fn view_in_place_follows_precedence() {
        let catalog = AvatarCatalog::new(vec![PathBuf::from("/avatars/fox.png")]);
        assert_eq!(
            catalog.view_in_place(&key("friday"), None),
            AvatarView::Image {
                src: "/avatars/fox.png".into()
            }
        );
        assert_eq!(
            catalog.view_in_place(&AvatarKey::new("friday", "assistant", false, 0), None),
            AvatarView::Initials("FR".into())
        );
        assert_eq!(
            catalog.view_in_place(&AvatarKey::new("sys", "system", true, 0), None),
            AvatarView::System
        );
        assert_eq!(
            AvatarCatalog::default().view_in_place(&key("friday"), None),
            AvatarView::Initials("FR".into())
        );
    }

    #[test]
    fn custom_render_wins_over_everything() {
        let render = |_: &AvatarKey| Some("<custom>".to_string());
        let system = AvatarKey::new("sys", "SYSTEM", true, 0);
        assert_eq!(
            resolve_avatar(&system, Some(&render), None),
            AvatarView::Custom("<custom>".into())
        );
    }

    #[test]
    fn custom_render_returning_none_falls_through() {
        let render = |_: &AvatarKey| -> Option<String> { None };
        let system = AvatarKey::new("sys", "System", false, 0);
        assert_eq!(resolve_avatar(&system, Some(&render), None), AvatarView::System);
    }

    #[test]
    fn initials_until_matching_image_is_loaded() {
        let k = key("friday");
        assert_eq!(resolve_avatar(&k, None, None), AvatarView::Initials("FR".into()));

        let other = LoadedAvatar {
            key: key("someone else"),
            path: "a.png".into(),
            src: "mem://a.png".into(),
        };
        assert_eq!(
            resolve_avatar(&k, None, Some(&other)),
            AvatarView::Initials("FR".into())
        );

        let mine = LoadedAvatar {
            key: k.clone(),
            ..other
        };
        assert_eq!(
            resolve_avatar(&k, None, Some(&mine)),
            AvatarView::Image {
                src: "mem://a.png".into()
            }
        );
    }

    #[tokio::test]
    async fn load_applies_for_current_key() {
        let mut loader = AvatarLoader::new(catalog(&["a.png"]), Arc::new(Immediate));
        let handle = loader.request(key("friday")).unwrap();
        let loaded = handle.await.unwrap().unwrap();

        assert!(loader.apply(loaded));
        assert_eq!(
            loader.view(None),
            Some(AvatarView::Image {
                src: "mem://a.png".into()
            })
        );
    }

    #[tokio::test]
    async fn repeated_request_with_same_key_does_not_reload() {
        let mut loader = AvatarLoader::new(catalog(&["a.png"]), Arc::new(Immediate));
        assert!(loader.request(key("friday")).is_some());
        assert!(loader.request(key("friday")).is_none());
    }

    #[tokio::test]
    async fn changing_inputs_cancels_in_flight_load() {
        let catalog = catalog(&["slow.png", "fast.png"]);
        let name_for = |asset: &str| {
            (0..)
                .map(|i| format!("agent-{i}"))
                .find(|name| catalog.select(name, 0).is_some_and(|p| p.ends_with(asset)))
                .unwrap()
        };
        let (slow, fast) = (name_for("slow.png"), name_for("fast.png"));
        let mut loader = AvatarLoader::new(Arc::clone(&catalog), Arc::new(SlowForOne));

        let stalled = loader.request(key(&slow)).unwrap();
        let fresh = loader.request(key(&fast)).unwrap();

        assert_eq!(stalled.await.unwrap(), None);
        let loaded = fresh.await.unwrap().unwrap();
        assert_eq!(loaded.key.name, fast);
        assert!(loader.apply(loaded));
    }

    #[tokio::test]
    async fn stale_result_is_dropped() {
        let mut loader = AvatarLoader::new(catalog(&["a.png"]), Arc::new(Immediate));
        let old = loader.request(key("first")).unwrap().await.unwrap().unwrap();
        let _ = loader.request(key("second"));

        assert!(!loader.apply(old));
        assert_eq!(loader.view(None), Some(AvatarView::Initials("SE".into())));
    }

    #[tokio::test]
    async fn failed_load_keeps_initials() {
        let mut loader = AvatarLoader::new(catalog(&["a.png"]), Arc::new(Failing));
        let handle = loader.request(key("friday")).unwrap();
        assert_eq!(handle.await.unwrap(), None);
        assert_eq!(loader.view(None), Some(AvatarView::Initials("FR".into())));
    }

    #[tokio::test]
    async fn no_load_when_random_avatar_disabled_or_system() {
        let mut loader = AvatarLoader::new(catalog(&["a.png"]), Arc::new(Immediate));
        assert!(loader.request(AvatarKey::new("friday", "assistant", false, 0)).is_none());
        assert!(loader.request(AvatarKey::new("sys", "system", true, 0)).is_none());
        assert_eq!(loader.view(None), Some(AvatarView::System));
    }

    #[tokio::test]
    async fn fs_fetcher_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.png");
        std::fs::write(&present, b"x").unwrap();

        let src = FsAssetFetcher.fetch(&present).await.unwrap();
        assert!(src.starts_with("file://"));
        assert!(FsAssetFetcher.fetch(&dir.path().join("b.png")).await.is_err());
        assert!(FsAssetFetcher.fetch(dir.path()).await.is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn selection_is_pure(name in ".{0,24}", seed in any::<i32>(), count in 1usize..16) {
                let assets: Vec<PathBuf> = (0..count).map(|i| PathBuf::from(format!("{i}.png"))).collect();
                let catalog = AvatarCatalog::new(assets);
                let first = catalog.select(&name, seed).map(Path::to_path_buf);
                let second = catalog.select(&name, seed).map(Path::to_path_buf);
                prop_assert!(first.is_some());
                prop_assert_eq!(first, second);
            }

            #[test]
            fn custom_render_always_wins(
                name in "[a-z]{0,8}",
                role in prop_oneof![Just("user"), Just("assistant"), Just("system"), Just("SYSTEM")],
                random in any::<bool>(),
                seed in any::<i32>(),
            ) {
                let k = AvatarKey::new(name, role, random, seed);
                let render = |_: &AvatarKey| Some("custom".to_string());
                prop_assert_eq!(resolve_avatar(&k, Some(&render), None), AvatarView::Custom("custom".into()));
            }
        }
    }
}
