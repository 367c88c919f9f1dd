//! Build targets: ordered source files linked into one firmware image.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One source file and the basename of the `.s`/`.o` files it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Source file to compile
    pub source: PathBuf,
    /// Output path without extension
    pub output_base: PathBuf,
}

impl CompileUnit {
    /// Assembly listing produced by the compile-to-assembly stage.
    pub fn asm(&self) -> PathBuf {
        with_suffix(&self.output_base, "s")
    }

    /// Object file produced by the compile-to-object stage.
    pub fn object(&self) -> PathBuf {
        with_suffix(&self.output_base, "o")
    }

}

/// A set of source files mapped to one output basename.
///
/// Every source maps to exactly one compile unit, in source order, so the
/// object list handed to the linker always mirrors the source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    sources: Vec<PathBuf>,
    basename: PathBuf,
    units: Vec<CompileUnit>,
}

impl BuildTarget {
    /// A target built from one source file.
    ///
    /// The basename is `output` if given, otherwise the source path without
    /// its extension (`demo.cpp` -> `demo`).
    pub fn single(source: impl Into<PathBuf>, output: Option<&str>) -> Self {
        let source = source.into();
        let basename = match output {
            Some(name) => PathBuf::from(name),
            None => default_basename(&source),
        };
        Self::from_parts(vec![source], basename, false)
    }

    /// A target that links every given source into one image.
    ///
    /// The basename is `output` if given, otherwise the first source's path
    /// without its extension. Returns `None` when there are no sources.
    pub fn linked(sources: Vec<PathBuf>, output: Option<&str>) -> Option<Self> {
        let first = sources.first()?;
        let basename = match output {
            Some(name) => PathBuf::from(name),
            None => default_basename(first),
        };
        Some(Self::from_parts(sources, basename, false))
    }

    /// The same sources under a different basename.
    ///
    /// Compile units of multi-source targets are scoped to the new basename
    /// (`<basename>-<source stem>`) so two renamed copies never share an
    /// object file. Repeated stems get a `-<n>` suffix, see
    /// [`BuildTarget::units`].
    pub fn renamed(&self, basename: impl Into<PathBuf>) -> Self {
        Self::from_parts(self.sources.clone(), basename.into(), true)
    }

    fn from_parts(sources: Vec<PathBuf>, basename: PathBuf, scoped: bool) -> Self {
        let units = if sources.len() == 1 {
            vec![CompileUnit {
                source: sources[0].clone(),
                output_base: basename.clone(),
            }]
        } else {
            let bases = sources.iter().map(|source| {
                if scoped {
                    scoped_unit_base(&basename, source)
                } else {
                    default_basename(source)
                }
            });
            sources
                .iter()
                .zip(unique_bases(bases))
                .map(|(source, output_base)| CompileUnit {
                    source: source.clone(),
                    output_base,
                })
                .collect()
        };

        BuildTarget {
            sources,
            basename,
            units,
        }
    }

    /// Source files, in link order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Output basename shared by the `.elf`, `.eep` and `.hex` files.
    pub fn basename(&self) -> &Path {
        &self.basename
    }

    /// Compile units, one per source.
    ///
    /// No two units share an output base. When two sources would map to the
    /// same one (`main.cpp` and `main.cc`, or `app/main.cpp` and
    /// `drv/main.cpp` in a renamed target), the later unit gets a `-<n>`
    /// suffix where `n` is its 1-based source position.
    pub fn units(&self) -> &[CompileUnit] {
        &self.units
    }

    /// Object files to link, one per source, in source order.
    pub fn objects(&self) -> Vec<PathBuf> {
        self.units.iter().map(CompileUnit::object).collect()
    }

    /// Linked image.
    pub fn elf(&self) -> PathBuf {
        with_suffix(&self.basename, "elf")
    }

    /// EEPROM image (Intel HEX).
    pub fn eep(&self) -> PathBuf {
        with_suffix(&self.basename, "eep")
    }

    /// Flashable program image (Intel HEX).
    pub fn hex(&self) -> PathBuf {
        with_suffix(&self.basename, "hex")
    }

    /// Sources joined for status messages.
    pub fn display_sources(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Path without its final extension.
pub fn default_basename(source: &Path) -> PathBuf {
    source.with_extension("")
}

fn scoped_unit_base(basename: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = basename
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    basename.with_file_name(format!("{}-{}", name, stem))
}

fn unique_bases(bases: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    bases
        .enumerate()
        .map(|(index, base)| {
            let mut candidate = base.clone();
            let mut n = index + 1;
            while !taken.insert(candidate.clone()) {
                candidate = numbered(&base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn numbered(base: &Path, n: usize) -> PathBuf {
    let mut name = base.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!("-{}", n));
    base.with_file_name(name)
}

/// Append `.ext` to the full path, keeping any dots already in the name.
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
