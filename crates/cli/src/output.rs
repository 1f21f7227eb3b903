use agentos_protocol::{CoreError, CursorPagination, PageDirection};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;

/// Exit code for failures reported as an error envelope
pub const CORE_ERROR_EXIT: u8 = 2;

#[derive(Args, Debug, Default)]
pub struct PageArgs {
    /// Page size (default 20)
    #[arg(long)]
    pub limit: Option<usize>,
    /// `nextCursor` of the previous page
    #[arg(long)]
    pub cursor: Option<String>,
    /// Walk towards older records
    #[arg(long)]
    pub backward: bool,
}

pub fn page_request(args: &PageArgs) -> CursorPagination {
    CursorPagination {
        cursor: args.cursor.clone(),
        limit: args.limit,
        direction: if args.backward {
            PageDirection::Backward
        } else {
            PageDirection::Forward
        },
    }
}

/// Pretty JSON on stdout; stdout carries nothing else.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Print a failure on stderr. Core errors become an `ErrorEnvelope` JSON line.
pub fn report_error(err: &anyhow::Error) -> ExitCode {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        match serde_json::to_string(&core.to_envelope()) {
            Ok(line) => eprintln!("{line}"),
            Err(_) => eprintln!("{core}"),
        }
        return ExitCode::from(CORE_ERROR_EXIT);
    }
    eprintln!("Error: {err:#}");
    ExitCode::FAILURE
}
