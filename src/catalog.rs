//! The resolved variant catalog.
//!
//! The declarative table is walked once, in declaration order, and every
//! update is merged into its already-resolved parent. Detection walks the
//! resulting records backwards, so more specific variants declared later
//! are tried before the ones they were derived from.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VariantError};
use crate::merge::merge;
use crate::model::{Variant, VariantDef};
use crate::table::variant_table;
use crate::{FORMAT_VERSION, VERSION};

static CATALOG: OnceCell<Catalog> = OnceCell::new();

/// All known variants, by name and in detection order.
#[derive(Debug)]
pub struct Catalog {
    variants: Vec<Variant>,
    by_name: HashMap<String, usize>,
    detect_order: Vec<usize>,
    declared: usize,
}

impl Catalog {
    /// Resolve a declarative table.
    ///
    /// Parents must be declared before the updates that refer to them.
    pub fn build(table: Vec<VariantDef>) -> Result<Self> {
        let declared = table.len();
        let mut variants: Vec<Variant> = Vec::with_capacity(declared);
        let mut by_name = HashMap::with_capacity(declared);

        for def in table {
            if by_name.contains_key(def.name()) {
                return Err(VariantError::config(def.name(), "declared more than once"));
            }
            let var = match def {
                VariantDef::Base(var) => var,
                VariantDef::Update(upd) => {
                    let parent = by_name
                        .get(&upd.parent)
                        .map(|&idx: &usize| &variants[idx])
                        .ok_or_else(|| {
                            VariantError::config(
                                &upd.name,
                                format!("unknown parent variant '{}'", upd.parent),
                            )
                        })?;
                    merge(parent, &upd)?
                }
            };
            by_name.insert(var.name.clone(), variants.len());
            variants.push(var);
        }

        let detect_order: Vec<usize> = (0..variants.len()).rev().collect();
        debug!(
            "Detection order: {}",
            detect_order
                .iter()
                .map(|&idx| variants[idx].name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(Self {
            variants,
            by_name,
            detect_order,
            declared,
        })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Look a variant up by name.
    pub fn get(&self, name: &str) -> Result<&Variant> {
        self.by_name
            .get(name)
            .map(|&idx| &self.variants[idx])
            .ok_or_else(|| VariantError::NotFound(name.to_string()))
    }

    /// Look a variant up by its builder alias.
    pub fn get_by_alias(&self, alias: &str) -> Result<&Variant> {
        self.variants
            .iter()
            .find(|var| var.builder.alias == alias)
            .ok_or_else(|| VariantError::AliasNotFound(alias.to_string()))
    }

    /// All variants in declaration order.
    pub fn list_all_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    /// All variants in the order detection tries them.
    pub fn list_all_variants_in_detection_order(&self) -> impl Iterator<Item = &Variant> {
        self.detect_order.iter().map(|&idx| &self.variants[idx])
    }

    /// The `show all` document: every variant plus the detection order.
    pub fn show_all(&self) -> serde_json::Result<Value> {
        #[derive(Serialize)]
        struct ShowAll<'a> {
            format: FormatVersion,
            order: Vec<&'a str>,
            variants: BTreeMap<&'a str, &'a Variant>,
            version: &'static str,
        }

        serde_json::to_value(ShowAll {
            format: FormatVersion::current(),
            order: self
                .list_all_variants_in_detection_order()
                .map(|var| var.name.as_str())
                .collect(),
            variants: self
                .variants
                .iter()
                .map(|var| (var.name.as_str(), var))
                .collect(),
            version: program_version(),
        })
    }
}

/// The `show <name>` document for a single variant.
pub fn show_variant(var: &Variant) -> serde_json::Result<Value> {
    #[derive(Serialize)]
    struct ShowOne<'a> {
        format: FormatVersion,
        variant: &'a Variant,
        version: &'static str,
    }

    serde_json::to_value(ShowOne {
        format: FormatVersion::current(),
        variant: var,
        version: program_version(),
    })
}

#[derive(Serialize)]
struct FormatVersion {
    version: FormatNumbers,
}

#[derive(Serialize)]
struct FormatNumbers {
    major: u32,
    minor: u32,
}

impl FormatVersion {
    fn current() -> Self {
        let (major, minor) = format_version();
        Self {
            version: FormatNumbers { major, minor },
        }
    }
}

/// Build the process-wide catalog on first use and return it.
pub fn build_variants() -> Result<&'static Catalog> {
    let catalog = CATALOG.get_or_try_init(|| Catalog::build(variant_table()?))?;
    assert!(
        catalog.variants.len() == catalog.declared
            && catalog.detect_order.len() == catalog.declared,
        "Internal error: {} variants built, {} declared, {} in detection order",
        catalog.variants.len(),
        catalog.declared,
        catalog.detect_order.len()
    );
    Ok(catalog)
}

/// The `(major, minor)` version of the `show` output format.
pub fn format_version() -> (u32, u32) {
    FORMAT_VERSION
}

/// The version of the variant data and tools.
pub fn program_version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Updates;
    use crate::model::{Detect, VariantUpdate};
    use std::collections::HashSet;

    fn catalog() -> &'static Catalog {
        build_variants().unwrap()
    }

    fn child(name: &str, parent: &str, updates: Updates) -> VariantDef {
        VariantDef::Update(VariantUpdate {
            name: name.to_string(),
            descr: format!("{name} test"),
            parent: parent.to_string(),
            detect: Detect::new(name, "/etc/test-release", "^ Test ", "test", "^1$").unwrap(),
            updates,
        })
    }

    fn base() -> Variant {
        catalog().get("DEBIAN12").unwrap().clone()
    }

    #[test]
    fn test_build_is_memoized() {
        let first = build_variants().unwrap();
        let second = build_variants().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_detection_order_is_reverse_declaration() {
        let cat = catalog();
        let table = variant_table().unwrap();
        assert_eq!(cat.len(), table.len());
        assert_eq!(cat.list_all_variants_in_detection_order().count(), cat.len());

        let first = cat.list_all_variants_in_detection_order().next().unwrap();
        assert_eq!(first.name, table.last().unwrap().name());

        let declared: Vec<_> = cat.list_all_variants().map(|var| &var.name).collect();
        let mut reversed: Vec<_> = cat
            .list_all_variants_in_detection_order()
            .map(|var| &var.name)
            .collect();
        reversed.reverse();
        assert_eq!(declared, reversed);
    }

    #[test]
    fn test_round_trip_lookup() {
        let cat = catalog();
        for var in cat.list_all_variants() {
            assert_eq!(cat.get(&var.name).unwrap().name, var.name);
            assert_eq!(cat.get_by_alias(&var.builder.alias).unwrap(), var);
        }
    }

    #[test]
    fn test_builder_aliases_are_unique() {
        let mut seen = HashSet::new();
        for var in catalog().list_all_variants() {
            if !var.builder.alias.is_empty() {
                assert!(seen.insert(&var.builder.alias), "{}", var.builder.alias);
            }
        }
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let err = catalog().get("BEOS5").unwrap_err();
        assert!(matches!(err, VariantError::NotFound(ref name) if name == "BEOS5"));
        assert!(err.is_not_found());

        let err = catalog().get_by_alias("beos5").unwrap_err();
        assert!(matches!(err, VariantError::AliasNotFound(ref alias) if alias == "beos5"));
    }

    #[test]
    fn test_children_inherit_from_parents() {
        let cat = catalog();
        let deb12 = cat.get("DEBIAN12").unwrap();
        let deb11 = cat.get("DEBIAN11").unwrap();
        assert_eq!(deb11.parent, "DEBIAN12");
        assert_eq!(deb11.commands, deb12.commands);
        assert_eq!(deb11.package, deb12.package);
        assert_eq!(deb11.builder.alias, "debian11");
        assert_eq!(deb11.builder.kernel_package, deb12.builder.kernel_package);
        assert_ne!(deb11.detect, deb12.detect);

        let deb10 = cat.get("DEBIAN10").unwrap();
        assert_eq!(deb10.min_sys_python, "2.7");
        assert_eq!(deb10.package["BINDINGS_PYTHON"], "python");
        assert_eq!(deb10.package["CGROUP"], "cgroup-tools");
    }

    #[test]
    fn test_families_and_repo_shapes_agree() {
        use crate::model::{Family, Repo};

        for var in catalog().list_all_variants() {
            match (var.family, &var.repo) {
                (Family::Debian, Repo::Deb(_)) | (Family::Redhat, Repo::Yum(_)) => (),
                other => panic!("{}: {:?}", var.name, other),
            }
            assert!(var.supported.repo, "{}", var.name);
        }
    }

    #[test]
    fn test_lowercase_mcelog_key_is_kept() {
        let var = catalog().get("UBUNTU1604").unwrap();
        assert_eq!(var.package["mcelog"], "mcelog");
        assert_eq!(var.package["MCELOG"], "bash");
        assert_eq!(var.package["LIBSSL"], "libssl1.0.0");
    }

    #[test]
    fn test_unknown_parent_is_a_config_error() {
        let table = vec![
            VariantDef::Base(base()),
            child("TEST1", "NONESUCH", Updates::new()),
        ];
        let err = Catalog::build(table).unwrap_err();
        assert!(matches!(err, VariantError::Config { ref variant, .. } if variant == "TEST1"));
    }

    #[test]
    fn test_parent_must_be_declared_first() {
        let table = vec![
            child("TEST1", "DEBIAN12", Updates::new()),
            VariantDef::Base(base()),
        ];
        assert!(Catalog::build(table).is_err());
    }

    #[test]
    fn test_duplicate_name_is_a_config_error() {
        let table = vec![
            VariantDef::Base(base()),
            child("DEBIAN12", "DEBIAN12", Updates::new()),
        ];
        let err = Catalog::build(table).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_bad_override_names_the_variant() {
        let table = vec![
            VariantDef::Base(base()),
            child("TEST1", "DEBIAN12", Updates::new().text("no_such_field", "x")),
        ];
        let err = Catalog::build(table).unwrap_err().to_string();
        assert!(err.contains("TEST1"), "{err}");
        assert!(err.contains("no_such_field"), "{err}");
    }

    #[test]
    fn test_versions() {
        assert_eq!(format_version(), (1, 3));
        assert_eq!(program_version(), "3.0.1");
        assert_eq!(program_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_show_documents() {
        let cat = catalog();
        let all = cat.show_all().unwrap();
        let (major, minor) = format_version();
        assert_eq!(all["format"]["version"]["major"], major);
        assert_eq!(all["format"]["version"]["minor"], minor);
        assert_eq!(all["version"], program_version());
        assert_eq!(all["order"][0], "ALMA8");
        assert_eq!(all["variants"].as_object().unwrap().len(), cat.len());

        let one = show_variant(cat.get("CENTOS7").unwrap()).unwrap();
        let var = &one["variant"];
        assert_eq!(var["name"], "CENTOS7");
        assert_eq!(var["family"], "redhat");
        assert_eq!(var["detect"]["filename"], "/etc/redhat-release");
        assert_eq!(var["detect"]["os_id"], "centos");
        assert_eq!(var["detect"]["os_version_regex"], r"^7(?:$|\.[0-9])");
        assert_eq!(var["repo"]["yumdef"], "redhat/repo/storpool-centos.repo");
        assert_eq!(var["commands"]["pkgfile"]["install"][0], "sh");
        assert_eq!(var["supported"]["repo"], true);
    }
}
