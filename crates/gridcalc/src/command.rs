//! Commands a host applies between evaluation passes

use crate::engine::Engine;
use crate::error::Result;
use gridcalc_core::{CellPosition, CellRange, SheetId};

/// One change to the workbook
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Store a literal or a formula; an empty content clears the cell
    UpdateCell {
        position: CellPosition,
        content: String,
    },
    ClearCell {
        position: CellPosition,
    },
    /// Force a display format, or drop it with `None`
    SetFormat {
        position: CellPosition,
        format: Option<String>,
    },
    AddMerge {
        sheet_id: SheetId,
        range: CellRange,
    },
    RemoveMerge {
        sheet_id: SheetId,
        range: CellRange,
    },
    CreateSheet {
        name: String,
    },
    DeleteSheet {
        sheet_id: SheetId,
    },
    RenameSheet {
        sheet_id: SheetId,
        name: String,
    },
    ResizeSheet {
        sheet_id: SheetId,
        rows: u32,
        cols: u16,
    },
}

impl Command {
    pub fn update(position: CellPosition, content: impl Into<String>) -> Self {
        Command::UpdateCell {
            position,
            content: content.into(),
        }
    }
}

impl Engine {
    /// Apply one command.
    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::UpdateCell { position, content } => self.set_cell_content(position, &content),
            Command::ClearCell { position } => {
                self.set_cell_content(position, "")?;
                self.set_cell_format(position, None)
            }
            Command::SetFormat { position, format } => self.set_cell_format(position, format),
            Command::AddMerge { sheet_id, range } => self.add_merge(sheet_id, range),
            Command::RemoveMerge { sheet_id, range } => self.remove_merge(sheet_id, &range).map(|_| ()),
            Command::CreateSheet { name } => self.create_sheet(&name).map(|_| ()),
            Command::DeleteSheet { sheet_id } => self.delete_sheet(sheet_id),
            Command::RenameSheet { sheet_id, name } => self.rename_sheet(sheet_id, &name),
            Command::ResizeSheet {
                sheet_id,
                rows,
                cols,
            } => self.resize_sheet(sheet_id, rows, cols),
        }
    }

    /// Apply commands in order, stopping at the first failure.
    pub fn dispatch_all(&mut self, commands: impl IntoIterator<Item = Command>) -> Result<()> {
        commands.into_iter().try_for_each(|command| self.dispatch(command))
    }
}
