use std::fs;

use sp_variant::{detect_from, Family, HostProbe, Repo, VariantError};
use tempfile::TempDir;

#[test]
fn test_lookup_facade() {
    let var = sp_variant::get("ROCKY8").unwrap();
    assert_eq!(var.family, Family::Redhat);
    assert_eq!(var.parent, "CENTOS8");
    assert_eq!(var.builder.alias, "rocky8");
    assert_eq!(sp_variant::get_by_alias("rocky8").unwrap(), var);

    let err = sp_variant::get("rocky8").unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_detection_error());
}

#[test]
fn test_listing_orders() {
    let declared = sp_variant::list_all_variants().unwrap();
    let detection = sp_variant::list_all_variants_in_detection_order().unwrap();
    assert_eq!(declared.len(), 16);
    assert_eq!(declared.first().unwrap().name, "DEBIAN12");
    assert_eq!(detection.first().unwrap().name, "ALMA8");
    assert!(declared.iter().rev().eq(detection.iter()));
}

#[test]
fn test_every_variant_has_its_own_detection_rule() {
    let vars = sp_variant::list_all_variants().unwrap();
    for (idx, var) in vars.iter().enumerate() {
        for other in &vars[idx + 1..] {
            assert_ne!(var.detect, other.detect, "{} and {}", var.name, other.name);
        }
    }
}

#[test]
fn test_redhat_variants_share_the_centos_repo_files() {
    for var in sp_variant::list_all_variants().unwrap() {
        if let Repo::Yum(yum) = &var.repo {
            assert_eq!(yum.yumdef.to_str(), Some("redhat/repo/storpool-centos.repo"));
            assert_eq!(var.file_ext, "rpm");
        }
    }
}

#[test]
fn test_detect_in_a_chroot() {
    let root = TempDir::new().unwrap();
    fs::create_dir(root.path().join("etc")).unwrap();
    fs::write(
        root.path().join("etc/os-release"),
        "NAME=\"AlmaLinux\"\nID=\"alma\"\nVERSION_ID=\"8.7\"\n",
    )
    .unwrap();

    let catalog = sp_variant::build_variants().unwrap();
    let var = detect_from(catalog, &HostProbe::new(root.path())).unwrap();
    assert_eq!(var.name, "ALMA8");
    assert_eq!(
        var.command("package.install").unwrap()[..3],
        ["dnf", "--enablerepo=storpool-contrib", "--enablerepo=powertools"]
    );
}

#[test]
fn test_almalinux_os_id_falls_back_to_the_release_file() {
    let root = TempDir::new().unwrap();
    fs::create_dir(root.path().join("etc")).unwrap();
    fs::write(
        root.path().join("etc/os-release"),
        "NAME=\"AlmaLinux\"\nID=\"almalinux\"\nVERSION_ID=\"8.7\"\n",
    )
    .unwrap();

    let catalog = sp_variant::build_variants().unwrap();
    let probe = HostProbe::new(root.path());
    assert!(matches!(
        detect_from(catalog, &probe),
        Err(VariantError::UnknownVariant)
    ));

    fs::write(
        root.path().join("etc/redhat-release"),
        "AlmaLinux release 8.7 (Stone Smilodon)\n",
    )
    .unwrap();
    assert_eq!(detect_from(catalog, &probe).unwrap().name, "ALMA8");
}

#[test]
fn test_detection_errors_are_not_defaulted() {
    let root = TempDir::new().unwrap();
    let catalog = sp_variant::build_variants().unwrap();
    let err = detect_from(catalog, &HostProbe::new(root.path())).unwrap_err();
    assert!(matches!(err, VariantError::UnknownVariant));
}
