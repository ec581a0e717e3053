use anyhow::{Context, Result};
use sp_variant::catalog::show_variant;
use sp_variant::detect::detect_from;
use sp_variant::model::Variant;
use sp_variant::{format_version, process, program_version, repo, Catalog, HostProbe};
use tracing::debug;

use super::args::{Cli, Command, CommandCmd, RepoCmd};

/// Commands too long to be shown in full by `command list`.
const CMD_LIST_BRIEF: &[(&str, &str)] = &[("pkgfile", "install")];

pub(crate) fn dispatch(cli: Cli) -> Result<()> {
    let catalog = sp_variant::build_variants().context("building the variant catalog")?;
    let probe = HostProbe::new(&cli.root);
    debug!("Examining the tree at {}", probe.root().display());

    match cli.command {
        Command::Command(CommandCmd::List) => command_list(catalog, &probe),
        Command::Command(CommandCmd::Run {
            noop,
            command,
            args,
        }) => command_run(catalog, &probe, &command, &args, noop),
        Command::Detect => {
            let var = detect(catalog, &probe)?;
            println!("{}", var.name);
            Ok(())
        }
        Command::Features => {
            let (major, minor) = format_version();
            println!(
                "Features: repo=0.2 variant={} format={major}.{minor}",
                program_version()
            );
            Ok(())
        }
        Command::Repo(RepoCmd::Add {
            repodir,
            repotype,
            noop,
        }) => {
            let var = detect(catalog, &probe)?;
            let actions =
                repo::plan_repo_add(var, &repodir, repotype, process::command_exists("rpmkeys"))
                    .with_context(|| {
                        format!(
                            "preparing to add the {repotype} repository for {}",
                            var.name
                        )
                    })?;
            repo::execute(&actions, noop).with_context(|| {
                format!("adding the {repotype} repository for {}", var.name)
            })
        }
        Command::Show { name } => show(catalog, &probe, &name),
    }
}

fn detect<'a>(catalog: &'a Catalog, probe: &HostProbe) -> Result<&'a Variant> {
    detect_from(catalog, probe).context("detecting the build variant")
}

fn command_list(catalog: &Catalog, probe: &HostProbe) -> Result<()> {
    let var = detect(catalog, probe)?;
    for (category, name, argv) in var.commands.entries() {
        let shown = if CMD_LIST_BRIEF.contains(&(category, name)) {
            "...".to_string()
        } else {
            argv.join(" ")
        };
        println!("{category}.{name}: {shown}");
    }
    Ok(())
}

fn command_run(
    catalog: &Catalog,
    probe: &HostProbe,
    id: &str,
    args: &[String],
    noop: bool,
) -> Result<()> {
    let var = detect(catalog, probe)?;
    let argv: Vec<String> = var
        .command(id)?
        .iter()
        .chain(args)
        .cloned()
        .collect();
    debug!("About to run `{}`", process::command_line(&argv));
    if noop {
        println!("{}", process::command_line(&argv));
        return Ok(());
    }
    process::run(&argv).with_context(|| format!("running the {id} command for {}", var.name))
}

fn show(catalog: &Catalog, probe: &HostProbe, name: &str) -> Result<()> {
    let data = match name {
        "all" => catalog.show_all()?,
        "current" => show_variant(detect(catalog, probe)?)?,
        other => show_variant(catalog.get(other)?)?,
    };
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
