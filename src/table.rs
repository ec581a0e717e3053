//! The declarative table of StorPool build variants.
//!
//! Entries are listed parents first; every update names a variant declared
//! earlier in the table. Detection tries them in the reverse order.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::merge::Updates;
use crate::model::{
    Builder, Commands, CommandsPackage, CommandsPkgFile, DebRepo, Detect, Family, Repo,
    Supported, Variant, VariantDef, VariantUpdate, YumRepo,
};

const CMD_NOOP: &[&str] = &["true"];

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn packages(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn update(
    name: &str,
    descr: &str,
    parent: &str,
    detect: Detect,
    updates: Updates,
) -> VariantDef {
    VariantDef::Update(VariantUpdate {
        name: name.to_string(),
        descr: descr.to_string(),
        parent: parent.to_string(),
        detect,
        updates,
    })
}

fn builder_updates(alias: &str, base_image: &str, branch: &str) -> Updates {
    Updates::new()
        .text("alias", alias)
        .text("base_image", base_image)
        .text("branch", branch)
}

fn rpm_pkgfile_install(tool: &str, repos: &str) -> String {
    format!(
        r#"
unset to_install to_reinstall
for f in $packages; do
    package="$(rpm -qp "$f")"
    if rpm -q -- "$package"; then
        to_reinstall="$to_reinstall ./$f"
    else
        to_install="$to_install ./$f"
    fi
done

if [ -n "$to_install" ]; then
    {tool} install -y --enablerepo={repos} --setopt=localpkg_gpgcheck=0 -- $to_install
fi
if [ -n "$to_reinstall" ]; then
    {tool} reinstall -y --enablerepo={repos} --setopt=localpkg_gpgcheck=0 -- $to_reinstall
fi
"#
    )
}

fn debian_detect(name: &str, codename: &str, version: &str) -> Result<Detect> {
    Detect::new(
        name,
        "/etc/os-release",
        &format!(
            r"^ PRETTY_NAME= .* Debian \s+ GNU/Linux \s+ (?: {codename} | {version} ) (?: \s | / )"
        ),
        "debian",
        &format!("^{version}$"),
    )
}

fn ubuntu_detect(name: &str, version: &str, mint: Option<&str>) -> Result<Detect> {
    let escaped = version.replace('.', r" \. ");
    let pretty = match mint {
        Some(mint) => format!(r"^ PRETTY_NAME= .* (?: Ubuntu \s+ {escaped} | Mint \s+ {mint} ) "),
        None => format!(r"^ PRETTY_NAME= .* Ubuntu \s+ {escaped} "),
    };
    Detect::new(
        name,
        "/etc/os-release",
        &pretty,
        "ubuntu",
        &format!("^{}$", version.replace('.', r"\.")),
    )
}

fn debian12() -> Result<Variant> {
    Ok(Variant {
        name: "DEBIAN12".to_string(),
        descr: "Debian 12.x (bookworm/unstable)".to_string(),
        parent: String::new(),
        family: Family::Debian,
        detect: debian_detect("DEBIAN12", "bookworm", "12")?,
        supported: Supported { repo: true },
        commands: Commands {
            package: CommandsPackage {
                update_db: strs(&["apt-get", "-q", "-y", "update"]),
                install: strs(&[
                    "env",
                    "DEBIAN_FRONTEND=noninteractive",
                    "apt-get",
                    "-q",
                    "-y",
                    "--no-install-recommends",
                    "install",
                    "--",
                ]),
                list_all: strs(&[
                    "dpkg-query",
                    "-W",
                    "-f",
                    r"${Package}\t${Version}\t${Architecture}\t${db:Status-Abbrev}\n",
                    "--",
                ]),
                purge: strs(&[
                    "env",
                    "DEBIAN_FRONTEND=noninteractive",
                    "apt-get",
                    "-q",
                    "-y",
                    "purge",
                    "--",
                ]),
                remove: strs(&[
                    "env",
                    "DEBIAN_FRONTEND=noninteractive",
                    "apt-get",
                    "-q",
                    "-y",
                    "remove",
                    "--",
                ]),
                remove_impl: strs(&[
                    "env",
                    "DEBIAN_FRONTEND=noninteractive",
                    "dpkg",
                    "-r",
                    "--",
                ]),
            },
            pkgfile: CommandsPkgFile {
                dep_query: strs(&[
                    "sh",
                    "-c",
                    r#"dpkg-deb -f -- "$pkg" 'Depends' | sed -e 's/ *, */,/g' | tr ',' "\n""#,
                ]),
                install: strs(&[
                    "sh",
                    "-c",
                    "env DEBIAN_FRONTEND=noninteractive apt-get install \
                     --no-install-recommends --reinstall -y \
                     -o DPkg::Options::=--force-confnew \
                     -- $packages",
                ]),
            },
        },
        min_sys_python: "3.9".to_string(),
        repo: Repo::Deb(DebRepo {
            codename: "unstable".to_string(),
            vendor: "debian".to_string(),
            sources: PathBuf::from("debian/repo/storpool.sources"),
            keyring: PathBuf::from("debian/repo/storpool-keyring.gpg"),
            req_packages: strs(&["ca-certificates"]),
        }),
        package: packages(&[
            ("BINDINGS_PYTHON", "python3"),
            ("BINDINGS_PYTHON_CONFGET", "python3-confget"),
            ("BINDINGS_PYTHON_SIMPLEJSON", "python3-simplejson"),
            ("CGROUP", "cgroup-tools"),
            ("CPUPOWER", "linux-cpupower"),
            ("LIBSSL", "libssl1.1"),
            ("MCELOG", "mcelog"),
        ]),
        systemd_lib: "lib/systemd/system".to_string(),
        file_ext: "deb".to_string(),
        initramfs_flavor: "update-initramfs".to_string(),
        builder: Builder {
            alias: "debian12".to_string(),
            base_image: "debian:unstable".to_string(),
            branch: "debian/unstable".to_string(),
            kernel_package: "linux-headers".to_string(),
            utf8_locale: "C.UTF-8".to_string(),
        },
    })
}

fn centos8() -> Result<Variant> {
    Ok(Variant {
        name: "CENTOS8".to_string(),
        descr: "CentOS 8.x".to_string(),
        parent: String::new(),
        family: Family::Redhat,
        detect: Detect::new(
            "CENTOS8",
            "/etc/redhat-release",
            r"^ CentOS \s .* \s 8 \. (?: [3-9] | (?: [12][0-9] ) )",
            "centos",
            r"^8(?:$|\.[4-9]|\.[1-9][0-9])",
        )?,
        supported: Supported { repo: true },
        commands: Commands {
            package: CommandsPackage {
                update_db: strs(CMD_NOOP),
                install: strs(&[
                    "dnf",
                    "--enablerepo=storpool-contrib",
                    "--enablerepo=powertools",
                    "install",
                    "-q",
                    "-y",
                    "--",
                ]),
                list_all: strs(&["rpm", "-qa", "--qf", r"%{Name}\t%{EVR}\t%{Arch}\tii\n", "--"]),
                purge: strs(&["yum", "remove", "-q", "-y", "--"]),
                remove: strs(&["yum", "remove", "-q", "-y", "--"]),
                remove_impl: strs(&["rpm", "-e", "--"]),
            },
            pkgfile: CommandsPkgFile {
                dep_query: strs(&["sh", "-c", r#"rpm -qpR -- "$pkg""#]),
                install: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    rpm_pkgfile_install("dnf", "storpool-contrib,powertools"),
                ],
            },
        },
        min_sys_python: "2.7".to_string(),
        repo: Repo::Yum(YumRepo {
            yumdef: PathBuf::from("redhat/repo/storpool-centos.repo"),
            keyring: PathBuf::from("redhat/repo/RPM-GPG-KEY-StorPool"),
        }),
        package: packages(&[
            ("KMOD", "kmod"),
            ("LIBCGROUP", "libcgroup-tools"),
            ("LIBUDEV", "systemd-libs"),
            ("OPENSSL", "openssl-libs"),
            ("PERL_AUTODIE", "perl-autodie"),
            ("PERL_FILE_PATH", "perl-File-Path"),
            ("PERL_LWP_PROTO_HTTPS", "perl-LWP-Protocol-https"),
            ("PERL_SYS_SYSLOG", "perl-Sys-Syslog"),
            ("PYTHON_SIMPLEJSON", "python2-simplejson"),
            ("PROCPS", "procps-ng"),
            ("UDEV", "systemd"),
        ]),
        systemd_lib: "usr/lib/systemd/system".to_string(),
        file_ext: "rpm".to_string(),
        initramfs_flavor: "mkinitrd".to_string(),
        builder: Builder {
            alias: "centos8".to_string(),
            base_image: "centos:8".to_string(),
            branch: "centos/8".to_string(),
            kernel_package: "kernel-core".to_string(),
            utf8_locale: "C.utf8".to_string(),
        },
    })
}

/// The full variant table in declaration order.
pub fn variant_table() -> Result<Vec<VariantDef>> {
    let python2_bindings = || {
        Updates::new()
            .text("BINDINGS_PYTHON", "python")
            .text("BINDINGS_PYTHON_CONFGET", "python-confget")
            .text("BINDINGS_PYTHON_SIMPLEJSON", "python-simplejson")
    };
    let el8_detect = |name: &str, release: &str, os_id: &str| {
        Detect::new(
            name,
            "/etc/redhat-release",
            &format!(r"^ {release} \s .* \s 8 \. (?: [4-9] | [1-9][0-9] )"),
            os_id,
            r"^8(?:$|\.[4-9]|\.[1-9][0-9])",
        )
    };

    Ok(vec![
        VariantDef::Base(debian12()?),
        update(
            "DEBIAN11",
            "Debian 11.x (bullseye)",
            "DEBIAN12",
            debian_detect("DEBIAN11", "bullseye", "11")?,
            Updates::new()
                .map("repo", Updates::new().text("codename", "bullseye"))
                .map(
                    "builder",
                    builder_updates("debian11", "debian:bullseye", "debian/bullseye"),
                ),
        ),
        update(
            "DEBIAN10",
            "Debian 10.x (buster)",
            "DEBIAN11",
            debian_detect("DEBIAN10", "buster", "10")?,
            Updates::new()
                .map("repo", Updates::new().text("codename", "buster"))
                .text("min_sys_python", "2.7")
                .map("package", python2_bindings())
                .map(
                    "builder",
                    builder_updates("debian10", "debian:buster", "debian/buster"),
                ),
        ),
        update(
            "DEBIAN9",
            "Debian 9.x (stretch)",
            "DEBIAN10",
            debian_detect("DEBIAN9", "stretch", "9")?,
            Updates::new()
                .map(
                    "repo",
                    Updates::new()
                        .text("codename", "stretch")
                        .list("req_packages", &["apt-transport-https", "ca-certificates"]),
                )
                .map(
                    "builder",
                    builder_updates("debian9", "debian:stretch", "debian/stretch"),
                ),
        ),
        update(
            "UBUNTU2204",
            "Ubuntu 22.04 LTS (Jammy Jellyfish)",
            "DEBIAN12",
            ubuntu_detect("UBUNTU2204", "22.04", Some("22"))?,
            Updates::new()
                .map(
                    "repo",
                    Updates::new()
                        .text("vendor", "ubuntu")
                        .text("codename", "jammy"),
                )
                .map(
                    "package",
                    Updates::new()
                        .text("CPUPOWER", "linux-tools-generic")
                        .text("MCELOG", "bash"),
                )
                .map(
                    "builder",
                    builder_updates("ubuntu-22.04", "ubuntu:jammy", "ubuntu/jammy"),
                ),
        ),
        update(
            "UBUNTU2110",
            "Ubuntu 21.10 LTS (Impish Indri)",
            "UBUNTU2204",
            ubuntu_detect("UBUNTU2110", "21.10", Some("21"))?,
            Updates::new()
                .map(
                    "repo",
                    Updates::new()
                        .text("vendor", "ubuntu")
                        .text("codename", "impish"),
                )
                .map(
                    "builder",
                    builder_updates("ubuntu-21.10", "ubuntu:impish", "ubuntu/impish"),
                ),
        ),
        update(
            "UBUNTU2004",
            "Ubuntu 20.04 LTS (Focal Fossa)",
            "UBUNTU2110",
            ubuntu_detect("UBUNTU2004", "20.04", Some("20"))?,
            Updates::new()
                .map(
                    "repo",
                    Updates::new()
                        .text("vendor", "ubuntu")
                        .text("codename", "focal"),
                )
                .text("min_sys_python", "3.8")
                .map(
                    "builder",
                    builder_updates("ubuntu-20.04", "ubuntu:focal", "ubuntu/focal"),
                ),
        ),
        update(
            "UBUNTU1804",
            "Ubuntu 18.04 LTS (Bionic Beaver)",
            "UBUNTU2004",
            ubuntu_detect("UBUNTU1804", "18.04", None)?,
            Updates::new()
                .map("repo", Updates::new().text("codename", "bionic"))
                .text("min_sys_python", "2.7")
                .map("package", python2_bindings())
                .map(
                    "builder",
                    builder_updates("ubuntu-18.04", "ubuntu:bionic", "ubuntu/bionic"),
                ),
        ),
        update(
            "UBUNTU1604",
            "Ubuntu 16.04 LTS (Xenial Xerus)",
            "UBUNTU1804",
            ubuntu_detect("UBUNTU1604", "16.04", None)?,
            Updates::new()
                .map(
                    "repo",
                    Updates::new()
                        .text("codename", "xenial")
                        .list("req_packages", &["apt-transport-https", "ca-certificates"]),
                )
                .map(
                    "package",
                    // The lowercase key does not replace MCELOG; it is kept as declared.
                    Updates::new()
                        .text("LIBSSL", "libssl1.0.0")
                        .text("mcelog", "mcelog"),
                )
                .map(
                    "builder",
                    builder_updates("ubuntu-16.04", "ubuntu:xenial", "ubuntu/xenial"),
                ),
        ),
        VariantDef::Base(centos8()?),
        update(
            "CENTOS7",
            "CentOS 7.x",
            "CENTOS8",
            Detect::new(
                "CENTOS7",
                "/etc/redhat-release",
                r"^ (?: CentOS | Virtuozzo ) \s .* \s 7 \.",
                "centos",
                r"^7(?:$|\.[0-9])",
            )?,
            Updates::new()
                .map(
                    "commands",
                    Updates::new()
                        .map(
                            "package",
                            Updates::new().list(
                                "install",
                                &["yum", "--enablerepo=storpool-contrib", "install", "-q", "-y"],
                            ),
                        )
                        .map(
                            "pkgfile",
                            Updates::new().list(
                                "install",
                                &[
                                    "sh",
                                    "-c",
                                    &rpm_pkgfile_install("yum", "storpool-contrib"),
                                ],
                            ),
                        ),
                )
                .map(
                    "builder",
                    builder_updates("centos7", "centos:7", "centos/7")
                        .text("kernel_package", "kernel")
                        .text("utf8_locale", "C"),
                ),
        ),
        update(
            "CENTOS6",
            "CentOS 6.x",
            "CENTOS7",
            Detect::new(
                "CENTOS6",
                "/etc/redhat-release",
                r"^ CentOS \s .* \s 6 \.",
                "centos",
                r"^6(?:$|\.[0-9])",
            )?,
            Updates::new()
                .text("min_sys_python", "2.6")
                .map(
                    "package",
                    Updates::new()
                        .text("KMOD", "module-init-tools")
                        .text("LIBCGROUP", "libcgroup")
                        .text("LIBUDEV", "libudev")
                        .text("OPENSSL", "openssl")
                        .text("PERL_AUTODIE", "perl")
                        .text("PERL_FILE_PATH", "perl")
                        .text("PERL_LWP_PROTO_HTTPS", "perl")
                        .text("PERL_SYS_SYSLOG", "perl")
                        .text("PYTHON_SIMPLEJSON", "python-simplejson")
                        .text("PROCPS", "procps")
                        .text("UDEV", "udev"),
                )
                .map(
                    "builder",
                    builder_updates("centos6", "centos:6", "centos/6"),
                ),
        ),
        update(
            "ORACLE7",
            "Oracle Linux 7.x",
            "CENTOS7",
            Detect::new(
                "ORACLE7",
                "/etc/oracle-release",
                r"^ Oracle \s+ Linux \s .* \s 7 \.",
                "ol",
                r"^7(?:$|\.[0-9])",
            )?,
            Updates::new().map("builder", builder_updates("oracle7", "IGNORE", "")),
        ),
        update(
            "RHEL8",
            "RedHat Enterprise Linux 8.x",
            "CENTOS8",
            el8_detect("RHEL8", r"Red \s+ Hat \s+ Enterprise \s+ Linux", "rhel")?,
            Updates::new()
                .map(
                    "commands",
                    Updates::new()
                        .map(
                            "package",
                            Updates::new().list(
                                "install",
                                &[
                                    "dnf",
                                    "--enablerepo=storpool-contrib",
                                    "--enablerepo=codeready-builder-for-rhel-8-x86_64-rpms",
                                    "install",
                                    "-q",
                                    "-y",
                                    "--",
                                ],
                            ),
                        )
                        .map(
                            "pkgfile",
                            Updates::new().list(
                                "install",
                                &[
                                    "sh",
                                    "-c",
                                    &rpm_pkgfile_install(
                                        "dnf",
                                        "storpool-contrib,codeready-builder-for-rhel-8-x86_64-rpms",
                                    ),
                                ],
                            ),
                        ),
                )
                .map(
                    "builder",
                    builder_updates("rhel8", "redhat/ubi8:reg", ""),
                ),
        ),
        update(
            "ROCKY8",
            "Rocky Linux 8.x",
            "CENTOS8",
            el8_detect("ROCKY8", r"Rocky \s+ Linux", "rocky")?,
            Updates::new().map(
                "builder",
                builder_updates("rocky8", "rockylinux/rockylinux:8", ""),
            ),
        ),
        update(
            "ALMA8",
            "AlmaLinux 8.x",
            "CENTOS8",
            el8_detect("ALMA8", "AlmaLinux", "alma")?,
            Updates::new().map(
                "builder",
                builder_updates("alma8", "almalinux/almalinux:8", ""),
            ),
        ),
    ])
}
