//! `grc board` command - kanban view over tasks

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{print_record, success, today, truncate_str, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::board::{Board, Card, TaskStatusWriter};
use crate::core::identity::EntityPrefix;
use crate::core::store::TaskFilter;
use crate::entities::task::TaskStatus;

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Show the board, one column per status
    Show {
        /// Only cards assigned to this person
        #[arg(long, short = 'a')]
        assignee: Option<String>,

        /// Hide the COMPLETED and CANCELLED columns
        #[arg(long)]
        open: bool,
    },

    /// Move a card to another column
    Move {
        /// Task ID or short ID (TASK@N)
        task: String,

        /// Target column (todo, in_progress, in_review, completed, overdue, cancelled)
        status: TaskStatus,
    },
}

pub fn run(cmd: BoardCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BoardCommands::Show { assignee, open } => run_show(assignee, open, global),
        BoardCommands::Move { task, status } => run_move(&task, status, global),
    }
}

fn load_board(ws: &Workspace, filter: &TaskFilter) -> Result<Board> {
    let tasks = ws.store.list_tasks(filter).into_diagnostic()?;
    let short_ids = ws.store.short_ids(EntityPrefix::Task).into_diagnostic()?;
    Ok(Board::from_cards(tasks.iter().map(|t| {
        Card::from_task(t, short_ids.get(&t.id.to_string()).cloned())
    })))
}

fn run_show(assignee: Option<String>, open: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let mut board = load_board(
        &ws,
        &TaskFilter {
            assignee,
            ..Default::default()
        },
    )?;
    if open {
        board.columns.retain(|c| !c.status.is_closed());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&board, global.format),
        _ => {}
    }

    let now = today();
    for column in &board.columns {
        let header = format!("{} ({})", column.status.label(), column.cards.len());
        let header = match column.status {
            TaskStatus::Overdue => style(header).red().bold(),
            TaskStatus::Completed => style(header).green().bold(),
            TaskStatus::Cancelled => style(header).dim().bold(),
            _ => style(header).bold(),
        };
        println!("{}", header);
        if column.cards.is_empty() {
            println!("  {}", style("(empty)").dim());
        }
        for card in &column.cards {
            let due = match card.due_date {
                Some(d) if d < now && !card.status.is_closed() => {
                    format!(" {}", style(format!("due {}", d)).red())
                }
                Some(d) => format!(" {}", style(format!("due {}", d)).dim()),
                None => String::new(),
            };
            let assignee = card
                .assignee
                .as_deref()
                .map(|a| format!(" {}", style(format!("@{}", a)).magenta()))
                .unwrap_or_default();
            println!(
                "  {:<9} {:<8} {}{}{}",
                style(card.display_id()).cyan(),
                card.priority,
                truncate_str(&card.title, 50),
                assignee,
                due
            );
        }
        println!();
    }
    Ok(())
}

fn run_move(reference: &str, status: TaskStatus, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = ws.resolve(reference, EntityPrefix::Task)?;
    let mut board = load_board(&ws, &TaskFilter::default())?;

    let policy = ws.policy()?;
    let user = ws.user();
    let mut writer = TaskStatusWriter::new(&ws.store, &policy, &user);
    board
        .move_card(&id, status, &mut writer)
        .map_err(|e| miette::miette!("{}", e))?;

    success(
        global,
        format!(
            "Moved {} to {}",
            style(ws.display_id(&id)).cyan(),
            style(status.label()).yellow()
        ),
    );
    Ok(())
}
