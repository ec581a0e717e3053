//! Structural merge of a child variant's overrides into its parent.
//!
//! Overrides form a sparse tree of tagged values. Each fixed-shape record
//! exposes its fields through [`MergeRecord::field_mut`], tagged by kind, and
//! [`apply_updates`] pairs every override with the field it names:
//!
//! - a sub-record receives a nested [`Update::Map`] recursively;
//! - a string-keyed mapping (`package`) is merged key by key;
//! - text, path, list, and flag fields are replaced wholesale, but only by
//!   an override of the same kind.
//!
//! Anything else (unknown field, kind mismatch) is a configuration error
//! naming the variant and the dotted field path.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, VariantError};
use crate::model::{
    Builder, Commands, CommandsPackage, CommandsPkgFile, DebRepo, Repo, Supported, Variant,
    VariantUpdate, YumRepo,
};

/// Fields that always come from the child's own declaration.
const IDENTITY_FIELDS: &[&str] = &["name", "parent", "detect", "family"];

/// A single override value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Text(String),
    Path(PathBuf),
    List(Vec<String>),
    Flag(bool),
    Map(Updates),
}

impl Update {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Path(_) => "path",
            Self::List(_) => "list",
            Self::Flag(_) => "flag",
            Self::Map(_) => "mapping",
        }
    }
}

/// A sparse set of overrides, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Updates(BTreeMap<String, Update>);

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: Update) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn text(self, key: &str, value: &str) -> Self {
        self.set(key, Update::Text(value.to_string()))
    }

    pub fn path(self, key: &str, value: &str) -> Self {
        self.set(key, Update::Path(PathBuf::from(value)))
    }

    pub fn list(self, key: &str, value: &[&str]) -> Self {
        self.set(
            key,
            Update::List(value.iter().map(|item| item.to_string()).collect()),
        )
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.set(key, Update::Flag(value))
    }

    pub fn map(self, key: &str, value: Updates) -> Self {
        self.set(key, Update::Map(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Update)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// A mutable view of one field of a record, tagged by its kind.
pub(crate) enum FieldMut<'a> {
    Text(&'a mut String),
    Path(&'a mut PathBuf),
    List(&'a mut Vec<String>),
    Flag(&'a mut bool),
    Map(&'a mut BTreeMap<String, String>),
    Record(&'a mut dyn MergeRecord),
}

impl FieldMut<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Path(_) => "path",
            Self::List(_) => "list",
            Self::Flag(_) => "flag",
            Self::Map(_) => "mapping",
            Self::Record(_) => "record",
        }
    }
}

/// A fixed-shape record whose fields may be overridden.
pub(crate) trait MergeRecord {
    /// The named field, or `None` if the record has no such field.
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>>;
}

/// Build a child variant from its parent and the child's declaration.
///
/// The parent is left untouched; `name`, `descr`, `parent`, and `detect`
/// come from the child, everything else is inherited and then overridden.
pub fn merge(parent: &Variant, child: &VariantUpdate) -> Result<Variant> {
    debug!("- merging {} into {}", child.name, parent.name);
    if let Some((key, _)) = child
        .updates
        .iter()
        .find(|(key, _)| IDENTITY_FIELDS.contains(key))
    {
        return Err(VariantError::config(
            &child.name,
            format!("the '{key}' field may not be overridden"),
        ));
    }

    let mut merged = Variant {
        name: child.name.clone(),
        descr: child.descr.clone(),
        parent: child.parent.clone(),
        detect: child.detect.clone(),
        ..parent.clone()
    };
    apply_updates(&mut merged, &child.updates, &child.name, "")?;
    Ok(merged)
}

pub(crate) fn apply_updates(
    target: &mut dyn MergeRecord,
    updates: &Updates,
    variant: &str,
    prefix: &str,
) -> Result<()> {
    for (key, value) in updates.iter() {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        let field = target
            .field_mut(key)
            .ok_or_else(|| VariantError::config(variant, format!("unexpected field {path}")))?;

        match (field, value) {
            (FieldMut::Record(record), Update::Map(nested)) => {
                apply_updates(record, nested, variant, &path)?
            }
            (FieldMut::Map(map), Update::Map(nested)) => merge_map(map, nested, variant, &path)?,
            (FieldMut::Text(current), Update::Text(new)) => current.clone_from(new),
            (FieldMut::Path(current), Update::Path(new)) => current.clone_from(new),
            (FieldMut::List(current), Update::List(new)) => current.clone_from(new),
            (FieldMut::Flag(current), Update::Flag(new)) => *current = *new,
            (field, value) => {
                return Err(VariantError::config(
                    variant,
                    format!(
                        "{path} is a {}, cannot apply a {} update",
                        field.kind(),
                        value.kind()
                    ),
                ))
            }
        }
    }
    Ok(())
}

fn merge_map(
    map: &mut BTreeMap<String, String>,
    updates: &Updates,
    variant: &str,
    path: &str,
) -> Result<()> {
    for (key, value) in updates.iter() {
        match value {
            Update::Text(new) => {
                map.insert(key.to_string(), new.clone());
            }
            other => {
                return Err(VariantError::config(
                    variant,
                    format!(
                        "{path}.{key}: expected a string value, got a {}",
                        other.kind()
                    ),
                ))
            }
        }
    }
    Ok(())
}

impl MergeRecord for Variant {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "descr" => FieldMut::Text(&mut self.descr),
            "supported" => FieldMut::Record(&mut self.supported),
            "commands" => FieldMut::Record(&mut self.commands),
            "min_sys_python" => FieldMut::Text(&mut self.min_sys_python),
            "repo" => FieldMut::Record(&mut self.repo),
            "package" => FieldMut::Map(&mut self.package),
            "systemd_lib" => FieldMut::Text(&mut self.systemd_lib),
            "file_ext" => FieldMut::Text(&mut self.file_ext),
            "initramfs_flavor" => FieldMut::Text(&mut self.initramfs_flavor),
            "builder" => FieldMut::Record(&mut self.builder),
            _ => return None,
        })
    }
}

impl MergeRecord for Supported {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "repo" => Some(FieldMut::Flag(&mut self.repo)),
            _ => None,
        }
    }
}

impl MergeRecord for Commands {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "package" => Some(FieldMut::Record(&mut self.package)),
            "pkgfile" => Some(FieldMut::Record(&mut self.pkgfile)),
            _ => None,
        }
    }
}

impl MergeRecord for CommandsPackage {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(FieldMut::List(match name {
            "update_db" => &mut self.update_db,
            "install" => &mut self.install,
            "list_all" => &mut self.list_all,
            "purge" => &mut self.purge,
            "remove" => &mut self.remove,
            "remove_impl" => &mut self.remove_impl,
            _ => return None,
        }))
    }
}

impl MergeRecord for CommandsPkgFile {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(FieldMut::List(match name {
            "dep_query" => &mut self.dep_query,
            "install" => &mut self.install,
            _ => return None,
        }))
    }
}

// Only the fields of the shape actually present can be overridden.
impl MergeRecord for Repo {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match self {
            Self::Deb(deb) => deb.field_mut(name),
            Self::Yum(yum) => yum.field_mut(name),
        }
    }
}

impl MergeRecord for DebRepo {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "codename" => FieldMut::Text(&mut self.codename),
            "vendor" => FieldMut::Text(&mut self.vendor),
            "sources" => FieldMut::Path(&mut self.sources),
            "keyring" => FieldMut::Path(&mut self.keyring),
            "req_packages" => FieldMut::List(&mut self.req_packages),
            _ => return None,
        })
    }
}

impl MergeRecord for YumRepo {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "yumdef" => FieldMut::Path(&mut self.yumdef),
            "keyring" => FieldMut::Path(&mut self.keyring),
            _ => return None,
        })
    }
}

impl MergeRecord for Builder {
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(FieldMut::Text(match name {
            "alias" => &mut self.alias,
            "base_image" => &mut self.base_image,
            "branch" => &mut self.branch,
            "kernel_package" => &mut self.kernel_package,
            "utf8_locale" => &mut self.utf8_locale,
            _ => return None,
        }))
    }
}
