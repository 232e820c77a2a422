//! Output-path policies

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Signature of a caller-supplied output-path function.
///
/// Receives the base directory, the document path relative to it and the
/// target extension. Returning `None` skips the disk write for that file.
pub type OutputPathFn = Arc<dyn Fn(&Path, &Path, &str) -> Option<PathBuf> + Send + Sync>;

/// Where each rendered image is written
#[derive(Clone, Default)]
pub enum OutputPath {
    /// Next to the source document, extension swapped
    #[default]
    SwapExtension,
    /// Mirror the relative tree under another directory, extension swapped.
    /// A relative directory is taken relative to the base directory.
    Directory(PathBuf),
    /// All images in one directory, named `a___b.html.png` for `a/b.html`
    Flatten(PathBuf),
    /// Never write to disk
    Skip,
    Custom(OutputPathFn),
}

impl fmt::Debug for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPath::SwapExtension => f.write_str("SwapExtension"),
            OutputPath::Directory(d) => f.debug_tuple("Directory").field(d).finish(),
            OutputPath::Flatten(d) => f.debug_tuple("Flatten").field(d).finish(),
            OutputPath::Skip => f.write_str("Skip"),
            OutputPath::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl OutputPath {
    /// Compute the destination for `relative`, or `None` to skip the write
    pub fn resolve(&self, base_dir: &Path, relative: &Path, ext: &str) -> Option<PathBuf> {
        match self {
            OutputPath::SwapExtension => Some(swap_extension(base_dir, relative, ext)),
            OutputPath::Directory(dir) => Some(swap_extension(&base_dir.join(dir), relative, ext)),
            OutputPath::Flatten(dir) => Some(base_dir.join(dir).join(flattened_name(relative, ext))),
            OutputPath::Skip => None,
            OutputPath::Custom(f) => f(base_dir, relative, ext),
        }
    }
}

/// Replace the final extension of `relative` with `ext` and join it onto
/// `base_dir`. A path without an extension gets `ext` appended.
pub fn swap_extension(base_dir: &Path, relative: &Path, ext: &str) -> PathBuf {
    base_dir.join(relative.with_extension(ext))
}

fn flattened_name(relative: &Path, ext: &str) -> OsString {
    let mut name = OsString::new();
    for (i, part) in relative.iter().enumerate() {
        if i > 0 {
            name.push("___");
        }
        name.push(part);
    }
    name.push(".");
    name.push(ext);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_extension_and_joins() {
        let got = swap_extension(Path::new("/site"), Path::new("a/b/c.html"), "png");
        assert_eq!(got, PathBuf::from("/site/a/b/c.png"));
    }

    #[test]
    fn replaces_only_the_final_extension() {
        let got = swap_extension(Path::new("/site"), Path::new("a/b/c.tar.gz"), "png");
        assert_eq!(got, PathBuf::from("/site/a/b/c.tar.png"));
    }

    #[test]
    fn appends_extension_when_missing() {
        let got = swap_extension(Path::new("/site"), Path::new("docs/README"), "png");
        assert_eq!(got, PathBuf::from("/site/docs/README.png"));
    }

    #[test]
    fn directory_policy_mirrors_tree() {
        let policy = OutputPath::Directory(PathBuf::from("previews"));
        let got = policy.resolve(Path::new("/site"), Path::new("a/index.htm"), "webp");
        assert_eq!(got, Some(PathBuf::from("/site/previews/a/index.webp")));

        let policy = OutputPath::Directory(PathBuf::from("/out"));
        let got = policy.resolve(Path::new("/site"), Path::new("a/index.htm"), "png");
        assert_eq!(got, Some(PathBuf::from("/out/a/index.png")));
    }

    #[test]
    fn flatten_policy_joins_segments() {
        let policy = OutputPath::Flatten(PathBuf::from("images"));
        let got = policy.resolve(Path::new("/site"), Path::new("emails/welcome.html"), "png");
        assert_eq!(got, Some(PathBuf::from("/site/images/emails___welcome.html.png")));

        let got = policy.resolve(Path::new("/site"), Path::new("a/b/c.html"), "png");
        assert_eq!(got, Some(PathBuf::from("/site/images/a___b___c.html.png")));
    }

    #[test]
    fn skip_and_custom_policies() {
        assert_eq!(OutputPath::Skip.resolve(Path::new("/site"), Path::new("x.html"), "png"), None);

        let custom = OutputPath::Custom(Arc::new(|_base: &Path, rel: &Path, ext: &str| {
            if rel.starts_with("drafts") {
                None
            } else {
                Some(PathBuf::from("/tmp/out").join(rel.with_extension(ext)))
            }
        }));
        assert_eq!(custom.resolve(Path::new("/site"), Path::new("drafts/x.html"), "png"), None);
        assert_eq!(
            custom.resolve(Path::new("/site"), Path::new("y.html"), "png"),
            Some(PathBuf::from("/tmp/out/y.png"))
        );
    }
}
