//! # Table lifecycle
//!
//! A table owns the pager and the root page number. The root always lives
//! on page 0; a fresh database file gets page 0 initialized as an empty
//! leaf root at open.

use super::btree::initialize_leaf_node;
use super::cursor::Cursor;
use super::node::NodeType;
use super::pager::{lock_page, Pager};
use crate::errors::Error;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

pub struct Table {
    pub root_page_num: u32,
    pub pager: Pager,
}

impl Table {
    /// Opens the database file, creating it when absent.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file. Initialize page 0 as an empty leaf root.
            let page = pager.get_page(0)?;
            let mut root = lock_page(&page)?;
            initialize_leaf_node(&mut root);
            root.set_root(true);
        }

        info!(path = %path.display(), num_pages = pager.num_pages(), "Opened table");
        Ok(Table {
            root_page_num: 0,
            pager,
        })
    }

    /// Flushes the page cache and releases the file.
    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()?;
        info!("Closed table");
        Ok(())
    }

    /// Cursor at `key`, or at the position where `key` would be inserted.
    pub fn find(&mut self, key: u32) -> Result<Cursor<'_>, Error> {
        Cursor::find(self, key)
    }

    /// Cursor at the first row in key order.
    pub fn start(&mut self) -> Result<Cursor<'_>, Error> {
        Cursor::start(self)
    }

    /// Renders the tree as an indented outline, recursing from the root.
    pub fn render_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        render_node(&mut self.pager, self.root_page_num, 0, &mut out)?;
        Ok(out)
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn render_node(
    pager: &mut Pager,
    page_num: u32,
    level: usize,
    out: &mut String,
) -> Result<(), Error> {
    let page = pager.get_page(page_num)?;
    let node = lock_page(&page)?;

    match node.node_type()? {
        NodeType::Leaf => {
            let num_cells = node.leaf_num_cells();
            indent(out, level);
            let _ = writeln!(out, "- leaf (size {})", num_cells);
            for i in 0..num_cells {
                indent(out, level + 1);
                let _ = writeln!(out, "- {}", node.leaf_key(i as usize)?);
            }
        }
        NodeType::Internal => {
            let num_keys = node.internal_num_keys();
            let mut cells = Vec::with_capacity(num_keys as usize);
            for i in 0..num_keys {
                cells.push((node.internal_child(i)?, node.internal_key(i)?));
            }
            let right_child = node.internal_right_child();
            drop(node);

            indent(out, level);
            let _ = writeln!(out, "- internal (size {})", num_keys);
            for (child, key) in cells {
                render_node(pager, child, level + 1, out)?;
                indent(out, level + 1);
                let _ = writeln!(out, "- key {}", key);
            }
            render_node(pager, right_child, level + 1, out)?;
        }
    }
    Ok(())
}
