//! `grc member` command - workspace members and roles

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{print_record, success, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::identity::EntityPrefix;
use crate::entities::membership::{Membership, Role};

#[derive(Subcommand, Debug)]
pub enum MemberCommands {
    /// Add a member
    Add {
        /// Username (matched against GRC_USER / config user)
        username: String,

        #[arg(long, short = 'r', value_enum, default_value = "member")]
        role: Role,

        #[arg(long, short = 'e')]
        email: Option<String>,
    },

    /// List members
    List {
        /// Include deactivated members
        #[arg(long)]
        all: bool,
    },

    /// Change a member's role
    Role {
        /// Username or MBR@N
        member: String,

        #[arg(value_enum)]
        role: Role,
    },

    /// Deactivate a member
    Deactivate {
        /// Username or MBR@N
        member: String,
    },

    /// Show the acting user and their role
    Whoami,
}

const MEMBER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("username", "USERNAME", 24),
    ColumnDef::new("role", "ROLE", 9),
    ColumnDef::new("email", "EMAIL", 32),
    ColumnDef::new("active", "ACTIVE", 7),
    ColumnDef::new("created", "ADDED", 17),
];

pub fn run(cmd: MemberCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MemberCommands::Add {
            username,
            role,
            email,
        } => run_add(username, role, email, global),
        MemberCommands::List { all } => run_list(all, global),
        MemberCommands::Role { member, role } => run_role(&member, role, global),
        MemberCommands::Deactivate { member } => run_deactivate(&member, global),
        MemberCommands::Whoami => run_whoami(global),
    }
}

fn run_add(username: String, role: Role, email: Option<String>, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let policy = ws.policy()?;

    // The first member bootstraps the workspace and must be able to manage it
    if policy.is_open() && role != Role::Owner {
        return Err(miette::miette!(
            help = format!("run `grc member add {} --role owner` first", ws.user()),
            "the first member of a workspace must be an owner"
        ));
    }
    policy.check_role_change(&ws.user(), None, role)?;

    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(miette::miette!("username cannot be empty"));
    }
    let mut member = Membership::new(username, role);
    member.email = email;
    let short_id = ws.store.add_member(&member).into_diagnostic()?;

    success(
        global,
        format!(
            "Added {} as {} ({})",
            style(&member.username).cyan(),
            style(member.role).yellow(),
            short_id
        ),
    );
    Ok(())
}

fn run_list(all: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let members = ws.store.list_members(all).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&members, global.format),
        _ => {}
    }

    if members.is_empty() && !global.quiet {
        println!(
            "No members yet; access is open. Add an owner with {}",
            style("grc member add <you> --role owner").yellow()
        );
        return Ok(());
    }

    let short_ids = ws.store.short_ids(EntityPrefix::Mbr).into_diagnostic()?;
    let rows = members
        .iter()
        .map(|m| {
            TableRow::new(m.id.to_string(), &short_ids)
                .cell("username", CellValue::Text(m.username.clone()))
                .cell("role", CellValue::Role(m.role))
                .cell("email", CellValue::opt_text(m.email.as_deref()))
                .cell("active", CellValue::Flag(m.active))
                .cell("created", CellValue::DateTime(m.created))
        })
        .collect();
    TableFormatter::new(MEMBER_COLUMNS, "member", "MBR").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &[],
    );
    Ok(())
}

fn run_role(reference: &str, role: Role, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(reference, EntityPrefix::Mbr)?;
    let current = ws.store.get_member(&id).into_diagnostic()?;
    ws.policy()?
        .check_role_change(&ws.user(), Some(current.role), role)?;

    let member = ws.store.set_role(&id, role).into_diagnostic()?;
    success(
        global,
        format!(
            "{} is now {}",
            style(&member.username).cyan(),
            style(member.role).yellow()
        ),
    );
    Ok(())
}

fn run_deactivate(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(reference, EntityPrefix::Mbr)?;
    let current = ws.store.get_member(&id).into_diagnostic()?;
    let policy = ws.policy()?;
    if current.role == Role::Owner {
        policy.check_role_change(&ws.user(), Some(Role::Owner), Role::Owner)?;
    } else {
        policy.check(&ws.user(), Action::ManageMembers)?;
    }

    let member = ws.store.deactivate_member(&id).into_diagnostic()?;
    success(
        global,
        format!("Deactivated {}", style(&member.username).cyan()),
    );
    Ok(())
}

fn run_whoami(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let user = ws.user();
    let policy = ws.policy()?;

    match policy.member(&user) {
        Some(member) => println!("{} ({})", style(&member.username).cyan(), member.role),
        None if policy.is_open() => println!(
            "{} (no members recorded, access is open)",
            style(&user).cyan()
        ),
        None => println!("{} (not a member)", style(&user).cyan()),
    }
    Ok(())
}
