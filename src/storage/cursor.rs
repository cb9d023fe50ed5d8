//! # Cursor
//!
//! A cursor is a (page, cell) position inside the table, used both to read
//! rows in key order and to name the slot where an insert should land.

use super::node::NodeType;
use super::pager::lock_page;
use super::row::Row;
use super::table::Table;
use crate::errors::Error;

/// A position within the table.
///
/// The cursor borrows the table mutably for its entire lifetime, so at most
/// one cursor exists at a time.
pub struct Cursor<'a> {
    pub table: &'a mut Table,
    /// Current page number.
    pub page_num: u32,
    /// Current cell number within the page.
    pub cell_num: u32,
    /// Set when the cursor has moved one past the last row.
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Positions a cursor at the given key, or at the slot where the key
    /// would be inserted: the smallest index whose key is >= `key`, or one
    /// past the last cell when every key is smaller.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        let root_page_num = table.root_page_num;
        let node_type = {
            let root = table.pager.get_page(root_page_num)?;
            let root = lock_page(&root)?;
            root.node_type()?
        };

        match node_type {
            NodeType::Leaf => Self::leaf_find(table, root_page_num, key),
            NodeType::Internal => Self::internal_find(table, root_page_num, key),
        }
    }

    /// Positions a cursor at the first row of the table.
    ///
    /// The smallest key >= 0 is always the first key of the leftmost leaf,
    /// so this is a find for key 0 with the end flag derived from the
    /// landed leaf.
    pub fn start(table: &'a mut Table) -> Result<Self, Error> {
        let mut cursor = Self::find(table, 0)?;

        let num_cells = {
            let page = cursor.table.pager.get_page(cursor.page_num)?;
            let node = lock_page(&page)?;
            node.leaf_num_cells()
        };
        cursor.end_of_table = num_cells == 0;

        Ok(cursor)
    }

    /// Binary-search a leaf for `key`.
    fn leaf_find(table: &'a mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let cell_num = {
            let page = table.pager.get_page(page_num)?;
            let node = lock_page(&page)?;
            let num_cells = node.leaf_num_cells();

            let mut min_index = 0;
            let mut one_past_max_index = num_cells;
            let mut found = None;
            while one_past_max_index != min_index {
                let index = (min_index + one_past_max_index) / 2;
                let key_at_index = node.leaf_key(index as usize)?;
                if key == key_at_index {
                    found = Some(index);
                    break;
                }
                if key < key_at_index {
                    one_past_max_index = index;
                } else {
                    min_index = index + 1;
                }
            }
            found.unwrap_or(min_index)
        };

        Ok(Cursor {
            table,
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    /// Binary-search an internal node's separators and descend into the
    /// covering child. Exact separator matches descend left.
    fn internal_find(table: &'a mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let (child_page_num, child_type) = {
            let child_page_num = {
                let page = table.pager.get_page(page_num)?;
                let node = lock_page(&page)?;
                let child_index = node.internal_find_child(key)?;
                node.internal_child(child_index)?
            };
            let child = table.pager.get_page(child_page_num)?;
            let child = lock_page(&child)?;
            (child_page_num, child.node_type()?)
        };

        match child_type {
            NodeType::Leaf => Self::leaf_find(table, child_page_num, key),
            NodeType::Internal => Self::internal_find(table, child_page_num, key),
        }
    }

    /// Reads the row at the current position.
    pub fn row(&mut self) -> Result<Row, Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        let node = lock_page(&page)?;
        Row::deserialize(node.leaf_value(self.cell_num as usize)?)
    }

    /// Moves one cell forward, following the sibling pointer off the end of
    /// a leaf. A sibling pointer of 0 means this was the rightmost leaf.
    pub fn advance(&mut self) -> Result<(), Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        let node = lock_page(&page)?;

        self.cell_num += 1;
        if self.cell_num >= node.leaf_num_cells() {
            let next_page_num = node.leaf_next_leaf();
            if next_page_num == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_page_num;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
