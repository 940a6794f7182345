//! The file-type registry: named bundles of filename filter atoms, plus the
//! command-line administration operations that act on them before the
//! search-time tables are compiled.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::filter::TypeFilter;

/// Built-in file types. Atom encoding: a leading `.` marks an extension, a
/// leading `/` marks a first-line regex (recognized but not evaluated),
/// anything else is a literal filename.
static BUILTIN_TYPES: &[(&str, &[&str])] = &[
    ("actionscript", &[".as", ".mxml"]),
    ("ada", &[".ada", ".adb", ".ads"]),
    ("asm", &[".asm", ".s", ".S"]),
    ("asp", &[".asp"]),
    ("aspx", &[".master", ".ascx", ".asmx", ".aspx", ".svc"]),
    ("autoconf", &[".ac", ".in"]),
    ("automake", &[".am", ".in"]),
    ("awk", &[".awk"]),
    ("batch", &[".bat", ".cmd"]),
    ("cc", &[".c", ".h", ".xs"]),
    ("cfmx", &[".cfc", ".cfm", ".cfml"]),
    ("clojure", &[".clj"]),
    ("cmake", &["CMakeLists.txt", ".cmake"]),
    ("coffeescript", &[".coffee"]),
    ("cpp", &[".cpp", ".cc", ".cxx", ".m", ".hpp", ".hh", ".h", ".hxx"]),
    ("csharp", &[".cs"]),
    ("css", &[".css"]),
    ("dart", &[".dart"]),
    (
        "delphi",
        &[
            ".pas",
            ".int",
            ".dfm",
            ".nfm",
            ".dof",
            ".dpk",
            ".dproj",
            ".groupproj",
            ".bdsgroup",
            ".bdsproj",
        ],
    ),
    ("elisp", &[".el"]),
    ("elixir", &[".ex", ".exs"]),
    ("erlang", &[".erl", ".hrl"]),
    ("fortran", &[".f", ".f77", ".f90", ".f95", ".f03", ".for", ".ftn", ".fpp"]),
    ("go", &[".go"]),
    ("groovy", &[".groovy", ".gtmpl", ".gpp", ".grunit", ".gradle"]),
    ("haskell", &[".hs", ".lhs"]),
    ("hh", &[".h"]),
    ("html", &[".htm", ".html"]),
    ("jade", &[".jade"]),
    ("java", &[".java", ".properties"]),
    ("js", &[".js"]),
    ("json", &[".json"]),
    ("jsp", &[".jsp", ".jspx", ".jhtm", ".jhtml"]),
    ("less", &[".less"]),
    ("lisp", &[".lisp", ".lsp"]),
    ("lua", &[".lua", r"/^#!.*\blua(jit)?/"]),
    ("m4", &[".m4"]),
    (
        "make",
        &[".mk", ".mak", "makefile", "Makefile", "Makefile.Debug", "Makefile.Release"],
    ),
    ("matlab", &[".m"]),
    ("objc", &[".m", ".h"]),
    ("objcpp", &[".mm", ".h"]),
    ("ocaml", &[".ml", ".mli"]),
    ("parrot", &[".pir", ".pasm", ".pmc", ".ops", ".pod", ".pg", ".tg"]),
    ("perl", &[".pl", ".pm", ".pod", ".t", ".psgi", r"/^#!.*\bperl/"]),
    ("perltest", &[".t"]),
    (
        "php",
        &[".php", ".phpt", ".php3", ".php4", ".php5", ".phtml", r"/^#!.*\bphp/"],
    ),
    ("plone", &[".pt", ".cpt", ".metadata", ".cpy", ".py"]),
    ("python", &[".py", r"/^#!.*\bpython/"]),
    ("rake", &["Rakefile"]),
    ("rr", &[".R"]),
    ("rst", &[".rst"]),
    (
        "ruby",
        &[".rb", ".rhtml", ".rjs", ".rxml", ".erb", ".rake", ".spec", "Rakefile", r"/^#!.*\bruby/"],
    ),
    ("rust", &[".rs"]),
    ("sass", &[".sass", ".scss"]),
    ("scala", &[".scala"]),
    ("scheme", &[".scm", ".ss"]),
    (
        "shell",
        &[
            ".sh",
            ".bash",
            ".csh",
            ".tcsh",
            ".ksh",
            ".zsh",
            ".fish",
            r"/^#!.*\b(?:ba|t?c|k|z|fi)?sh\b/",
        ],
    ),
    ("smalltalk", &[".st"]),
    ("smarty", &[".tpl"]),
    ("sql", &[".sql", ".ctl"]),
    ("stylus", &[".styl"]),
    ("tcl", &[".tcl", ".itcl", ".itk"]),
    ("tex", &[".tex", ".cls", ".sty"]),
    ("text", &[".txt", "ChangeLog", "README"]),
    ("tt", &[".tt", ".tt2", ".ttml"]),
    ("vb", &[".bas", ".cls", ".frm", ".ctl", ".vb", ".resx"]),
    ("verilog", &[".v", ".vh", ".sv"]),
    ("vhdl", &[".vhd", ".vhdl"]),
    ("vim", &[".vim"]),
    ("xml", &[".xml", ".dtd", ".xsl", ".xslt", ".ent", r"/<[?]xml/"]),
    ("yaml", &[".yaml", ".yml"]),
    // Assorted file types that are non-binary but don't belong to any of the
    // languages above.
    ("miscellaneous", &[".qbk", ".w", ".ipp", ".patch", "configure"]),
];

lazy_static! {
    /// The builtin table parsed into atoms, once.
    static ref BUILTIN_TYPE_MAP: BTreeMap<String, Vec<FilterAtom>> = BUILTIN_TYPES
        .iter()
        .map(|(name, atoms)| {
            let atoms = atoms.iter().map(|a| FilterAtom::parse(a)).collect();
            (name.to_string(), atoms)
        })
        .collect();
}

/// Pseudo-type collecting `--ignore-file` filter specs; always deselected.
const IGNORE_FILE_TYPE: &str = "ignore-file";
/// Pseudo-type collecting `--include` globs; always selected.
const INCLUDE_GLOB_TYPE: &str = "include-glob";

/// A single include/exclude rule within a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterAtom {
    /// Filename extension, stored with its leading dot (".cpp").
    Ext(String),
    /// Literal basename ("Makefile").
    Literal(String),
    /// Include glob, matched against the basename.
    IncludeGlob(String),
    /// First-line regex; carried through for completeness, never evaluated.
    FirstLine(String),
}

impl FilterAtom {
    fn parse(spec: &str) -> FilterAtom {
        if spec.starts_with('.') {
            FilterAtom::Ext(spec.to_string())
        } else if spec.starts_with('/') {
            FilterAtom::FirstLine(spec.to_string())
        } else {
            FilterAtom::Literal(spec.to_string())
        }
    }
}

/// The registry of built-in and user-defined file types, and the glob lists
/// accumulated from `--include`/`--exclude`/`glob:`/`globx:` filters.
///
/// All mutation happens during argument parsing; `compile` then produces the
/// immutable search-time [`TypeFilter`].
#[derive(Debug, Clone)]
pub struct Types {
    /// Every known type, built-in and user-defined.
    all: BTreeMap<String, Vec<FilterAtom>>,
    /// The types whose atoms will be compiled into the filter tables.
    active: BTreeMap<String, Vec<FilterAtom>>,
    /// Atoms removed by deselections; compile skips these even when another
    /// active type carries the same atom.
    removed: HashSet<FilterAtom>,
    /// The first type selection clears the whole active map so that the
    /// named type becomes the only one searched.
    first_selection_seen: bool,
    /// Include/exclude globs in command-line order; the bool is true for
    /// includes. The last matching glob decides.
    ordered_globs: Vec<(String, bool)>,
    /// Exclude globs only, for vetoing extension/literal candidates.
    exclude_globs: Vec<String>,
}

impl Types {
    pub fn new() -> Types {
        let all = BUILTIN_TYPE_MAP.clone();
        let active = all.clone();

        Types {
            all,
            active,
            removed: HashSet::new(),
            first_selection_seen: false,
            ordered_globs: Vec::new(),
            exclude_globs: Vec::new(),
        }
    }

    /// True if `name` is a known (built-in or user-defined) type.
    pub fn is_type(&self, name: &str) -> bool {
        self.all.contains_key(name)
    }

    /// Type names beginning with `prefix`, in sorted order. Used to resolve
    /// the `--TYPE`/`--noTYPE` shortcut options. The internal pseudo-types
    /// are not addressable this way.
    pub fn matching_names(&self, prefix: &str) -> Vec<String> {
        self.all
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .filter(|(name, _)| {
                name.as_str() != IGNORE_FILE_TYPE && name.as_str() != INCLUDE_GLOB_TYPE
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `--type=TYPE`: activates a type. The first selection wipes the
    /// built-in active set so only explicitly selected types are searched;
    /// later selections add. Atoms previously removed by a deselection are
    /// un-removed, so `--type=nocpp --type=cc --type=hh` and `--type=hh`
    /// agree about `.h` files.
    pub fn select(&mut self, name: &str) -> bool {
        let atoms = match self.all.get(name) {
            Some(atoms) => atoms.clone(),
            None => return false,
        };

        if !self.first_selection_seen {
            self.active.clear();
            self.first_selection_seen = true;
        }

        for atom in &atoms {
            self.removed.remove(atom);
        }

        self.active.insert(name.to_string(), atoms);
        true
    }

    /// `--type=noTYPE`: deactivates a type and records its atoms so that
    /// compile skips them even if another active type shares them.
    pub fn deselect(&mut self, name: &str) -> bool {
        let atoms = match self.all.get(name) {
            Some(atoms) => atoms.clone(),
            None => return false,
        };

        for atom in atoms {
            self.removed.insert(atom);
        }

        self.active.remove(name);
        true
    }

    /// `--type-del=TYPE`. Deleting an unknown type is not an error.
    pub fn delete(&mut self, name: &str) -> bool {
        self.active.remove(name);
        self.all.remove(name).is_some()
    }

    /// `--type-add=NAME:FILTER:ARGS` (and `--type-set` with
    /// `replace = true`, which deletes any existing definition first).
    pub fn add_from_spec(&mut self, replace: bool, spec: &str) -> Result<()> {
        let parts: Vec<&str> = spec.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(Error::TypeSpec(format!(
                "Invalid filter specification \"{}\"",
                spec
            )));
        }

        let (name, filter, args) = (parts[0], parts[1], parts[2]);

        if replace {
            self.delete(name);
        }

        match filter {
            "is" => self.add_atom(name, FilterAtom::Literal(args.to_string())),
            "ext" => {
                for ext in args.split(',').filter(|e| !e.is_empty()) {
                    self.add_atom(name, FilterAtom::Ext(format!(".{}", ext)));
                }
            }
            "glob" => {
                self.add_atom(name, FilterAtom::IncludeGlob(args.to_string()));
                self.ordered_globs.push((args.to_string(), true));
                self.select(name);
            }
            "globx" => {
                self.exclude_globs.push(args.to_string());
                self.ordered_globs.push((args.to_string(), false));
            }
            other => {
                return Err(Error::TypeSpec(format!(
                    "Unknown filter type \"{}\" in type spec \"{}\"",
                    other, spec
                )));
            }
        }

        Ok(())
    }

    /// `--ignore-file=FILTER:ARGS`: behaves as if an anonymous type had been
    /// defined and immediately deselected.
    pub fn add_ignore_spec(&mut self, filter_args: &str) -> Result<()> {
        self.add_from_spec(false, &format!("{}:{}", IGNORE_FILE_TYPE, filter_args))?;
        self.deselect(IGNORE_FILE_TYPE);
        Ok(())
    }

    /// `--include=GLOB`: an include glob, which also counts as the first
    /// type selection (an explicit include narrows the search to it).
    pub fn add_include_glob(&mut self, glob: &str) -> Result<()> {
        self.add_from_spec(false, &format!("{}:glob:{}", INCLUDE_GLOB_TYPE, glob))
    }

    /// `--exclude=GLOB` / `--ignore=GLOB`.
    pub fn add_exclude_glob(&mut self, glob: &str) -> Result<()> {
        self.add_from_spec(false, &format!("{}:globx:{}", IGNORE_FILE_TYPE, glob))
    }

    fn add_atom(&mut self, name: &str, atom: FilterAtom) {
        self.all
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(atom.clone());
        self.active
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(atom);
    }

    /// Builds the immutable search-time tables from the active types, the
    /// removed-atom set, and the accumulated glob lists.
    pub fn compile(&self) -> Result<TypeFilter> {
        let mut extensions = Vec::new();
        let mut literals = Vec::new();

        for atoms in self.active.values() {
            for atom in atoms {
                // More than one type can carry the same atom; a removal
                // covers all of them.
                if self.removed.contains(atom) {
                    continue;
                }

                match atom {
                    FilterAtom::Ext(ext) => extensions.push(ext.clone()),
                    FilterAtom::Literal(name) => literals.push(name.clone()),
                    // Include globs are carried in ordered_globs; first-line
                    // regexes are recognized but not evaluated.
                    FilterAtom::IncludeGlob(_) | FilterAtom::FirstLine(_) => {}
                }
            }
        }

        TypeFilter::compile(&extensions, &literals, &self.exclude_globs, &self.ordered_globs)
    }

    /// (name, atoms) pairs for `--help-types`, skipping the internal
    /// pseudo-types.
    pub fn describe(&self) -> Vec<(&str, &[FilterAtom])> {
        self.all
            .iter()
            .filter(|(name, _)| name.as_str() != IGNORE_FILE_TYPE && name.as_str() != INCLUDE_GLOB_TYPE)
            .map(|(name, atoms)| (name.as_str(), atoms.as_slice()))
            .collect()
    }
}

impl Default for Types {
    fn default() -> Self {
        Types::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Types;

    #[test]
    fn test_builtins_admit_common_source_files() {
        let filter = Types::new().compile().unwrap();

        assert!(filter.admit("main.c"));
        assert!(filter.admit("mod.rs"));
        assert!(filter.admit("setup.py"));
        assert!(filter.admit("Makefile"));
        assert!(!filter.admit("run.log"));
        assert!(!filter.admit("a.out"));
    }

    #[test]
    fn test_first_selection_clears_builtins() {
        let mut types = Types::new();
        assert!(types.select("rust"));

        let filter = types.compile().unwrap();
        assert!(filter.admit("lib.rs"));
        assert!(!filter.admit("main.c"));
        assert!(!filter.admit("setup.py"));
    }

    #[test]
    fn test_second_selection_adds() {
        let mut types = Types::new();
        assert!(types.select("rust"));
        assert!(types.select("python"));

        let filter = types.compile().unwrap();
        assert!(filter.admit("lib.rs"));
        assert!(filter.admit("setup.py"));
        assert!(!filter.admit("main.c"));
    }

    #[test]
    fn test_deselect_removes_shared_atoms() {
        let mut types = Types::new();
        // .h belongs to cpp, cc, hh, objc, objcpp; deselecting cpp removes
        // the atom itself, so .h files no longer match through cc either.
        assert!(types.deselect("cpp"));

        let filter = types.compile().unwrap();
        assert!(!filter.admit("header.h"));
        assert!(!filter.admit("prog.cpp"));
        // .c belongs only to cc and survives.
        assert!(filter.admit("prog.c"));
    }

    #[test]
    fn test_select_unremoves_atoms() {
        let mut types = Types::new();
        assert!(types.deselect("cpp"));
        assert!(types.deselect("cc"));
        assert!(types.select("hh"));

        let filter = types.compile().unwrap();
        assert!(filter.admit("header.h"));
    }

    #[test]
    fn test_unknown_type_reports_false() {
        let mut types = Types::new();
        assert!(!types.select("nosuchtype"));
        assert!(!types.deselect("nosuchtype"));
    }

    #[test]
    fn test_type_add_appends_and_type_set_replaces() {
        let mut types = Types::new();
        types.add_from_spec(false, "web:ext:css,html").unwrap();
        types.add_from_spec(false, "web:is:robots.txt").unwrap();
        assert!(types.is_type("web"));

        types.select("web");
        let filter = types.compile().unwrap();
        assert!(filter.admit("style.css"));
        assert!(filter.admit("robots.txt"));

        let mut types = Types::new();
        types.add_from_spec(false, "web:ext:css").unwrap();
        types.add_from_spec(true, "web:ext:html").unwrap();
        types.select("web");
        let filter = types.compile().unwrap();
        assert!(!filter.admit("style.css"));
        assert!(filter.admit("index.html"));
    }

    #[test]
    fn test_malformed_specs_are_errors() {
        let mut types = Types::new();
        assert!(types.add_from_spec(false, "nocolon").is_err());
        assert!(types.add_from_spec(false, "name:ext").is_err());
        assert!(types.add_from_spec(false, "name:bogus:args").is_err());
    }

    #[test]
    fn test_matching_names_prefix() {
        let types = Types::new();
        assert_eq!(types.matching_names("rust"), vec!["rust".to_string()]);
        assert_eq!(
            types.matching_names("ja"),
            vec!["jade".to_string(), "java".to_string()]
        );
        assert!(types.matching_names("zzz").is_empty());
    }

    #[test]
    fn test_ignore_spec_excludes_files() {
        let mut types = Types::new();
        types.add_ignore_spec("ext:c").unwrap();

        let filter = types.compile().unwrap();
        assert!(!filter.admit("main.c"));
        assert!(filter.admit("main.py"));
    }

    #[test]
    fn test_include_glob_narrows_search() {
        let mut types = Types::new();
        types.add_include_glob("*.foo").unwrap();

        let filter = types.compile().unwrap();
        assert!(filter.admit("bar.foo"));
        // The include acted as the first type selection.
        assert!(!filter.admit("main.c"));
    }

    #[test]
    fn test_exclude_glob_vetoes_candidates() {
        let mut types = Types::new();
        types.add_exclude_glob("*_test.c").unwrap();

        let filter = types.compile().unwrap();
        assert!(filter.admit("main.c"));
        assert!(!filter.admit("main_test.c"));
    }
}
