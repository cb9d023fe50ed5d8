//! # B-Tree mutation
//!
//! Leaf insertion with splitting, root promotion and parent-key
//! maintenance. Search lives with the cursor; the accessors and layout
//! constants live in [`super::node`].
//!
//! Internal nodes never split. A split that would require one is refused
//! up front with [`Error::TableFull`], leaving the tree untouched.

use super::cursor::Cursor;
use super::node::{
    NodeType, Page, INTERNAL_NODE_MAX_CELLS, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use super::pager::lock_page;
use super::row::Row;
use super::table::Table;
use crate::errors::Error;
use tracing::debug;

pub fn initialize_leaf_node(node: &mut Page) {
    node.set_node_type(NodeType::Leaf);
    node.set_root(false);
    node.set_leaf_num_cells(0);
    node.set_leaf_next_leaf(0); // 0 represents no sibling
}

pub fn initialize_internal_node(node: &mut Page) {
    node.set_node_type(NodeType::Internal);
    node.set_root(false);
    node.set_internal_num_keys(0);
}

/// Inserts a key/row pair at the cursor position, shifting later cells one
/// slot to the right. A full leaf is split instead.
pub fn leaf_node_insert(cursor: &mut Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let page = cursor.table.pager.get_page(cursor.page_num)?;
    let mut node = lock_page(&page)?;

    let num_cells = node.leaf_num_cells();
    if num_cells as usize >= LEAF_NODE_MAX_CELLS {
        debug!(
            page_num = cursor.page_num,
            num_cells, "Leaf node full, splitting"
        );
        drop(node);
        return leaf_node_split_and_insert(cursor, key, row);
    }

    if cursor.cell_num < num_cells {
        // Make room for the new cell
        for i in ((cursor.cell_num + 1)..=num_cells).rev() {
            let prev = node.leaf_cell(i as usize - 1)?.to_vec();
            node.leaf_cell_mut(i as usize)?.copy_from_slice(&prev);
        }
    }

    node.set_leaf_num_cells(num_cells + 1);
    node.set_leaf_key(cursor.cell_num as usize, key)?;
    row.serialize(node.leaf_value_mut(cursor.cell_num as usize)?)?;
    Ok(())
}

/// Creates a new leaf, moves half the cells over, and inserts the new row
/// into one of the two nodes. The parent gains the new child, or a new root
/// is created when the split leaf was the root.
pub fn leaf_node_split_and_insert(cursor: &mut Cursor, key: u32, row: &Row) -> Result<(), Error> {
    // The parent must have room for one more child before anything is
    // mutated: internal nodes do not split, and a refused insert must leave
    // the tree exactly as it was.
    {
        let page = cursor.table.pager.get_page(cursor.page_num)?;
        let node = lock_page(&page)?;
        if !node.is_root() {
            let parent_page_num = node.parent();
            drop(node);
            let parent = cursor.table.pager.get_page(parent_page_num)?;
            let parent = lock_page(&parent)?;
            if parent.internal_num_keys() as usize >= INTERNAL_NODE_MAX_CELLS {
                return Err(Error::TableFull);
            }
        }
    }

    let new_page_num = cursor.table.pager.unused_page_num();
    debug!(
        page_num = cursor.page_num,
        new_page_num, "Splitting leaf node"
    );

    let old_page = cursor.table.pager.get_page(cursor.page_num)?;
    let new_page = cursor.table.pager.get_page(new_page_num)?;
    let mut old_node = lock_page(&old_page)?;
    let mut new_node = lock_page(&new_page)?;

    let old_max = old_node.max_key()?;

    initialize_leaf_node(&mut new_node);
    new_node.set_parent(old_node.parent());

    // The old leaf's sibling becomes the new leaf, and the new leaf's
    // sibling becomes whatever used to be the old leaf's sibling.
    new_node.set_leaf_next_leaf(old_node.leaf_next_leaf());
    old_node.set_leaf_next_leaf(new_page_num);

    // All existing keys plus the new key, divided evenly between the old
    // (left) and new (right) nodes. Starting from the right, each cell is
    // moved to its final position.
    let old = old_node.clone();
    for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
        let destination_node: &mut Page = if i >= LEAF_NODE_LEFT_SPLIT_COUNT {
            &mut new_node
        } else {
            &mut old_node
        };
        let index_within_node = i % LEAF_NODE_LEFT_SPLIT_COUNT;

        if i == cursor.cell_num as usize {
            destination_node.set_leaf_key(index_within_node, key)?;
            row.serialize(destination_node.leaf_value_mut(index_within_node)?)?;
        } else if i > cursor.cell_num as usize {
            destination_node
                .leaf_cell_mut(index_within_node)?
                .copy_from_slice(old.leaf_cell(i - 1)?);
        } else {
            destination_node
                .leaf_cell_mut(index_within_node)?
                .copy_from_slice(old.leaf_cell(i)?);
        }
    }

    old_node.set_leaf_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
    new_node.set_leaf_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

    // If the split node was the root it had no parent; promote a new root
    // to act as one. Otherwise the parent's separator for the old leaf
    // shrank and the new leaf has to be registered with it.
    if old_node.is_root() {
        drop(old_node);
        drop(new_node);
        create_new_root(cursor.table, new_page_num)
    } else {
        let parent_page_num = old_node.parent();
        let new_max = old_node.max_key()?;
        drop(old_node);
        drop(new_node);

        {
            let parent = cursor.table.pager.get_page(parent_page_num)?;
            let mut parent = lock_page(&parent)?;
            parent.update_internal_key(old_max, new_max)?;
        }
        internal_node_insert(cursor.table, parent_page_num, new_page_num)
    }
}

/// Root promotion.
///
/// The old root is copied to a fresh page and becomes the left child; the
/// right child is passed in. The root page itself is re-initialized as an
/// internal node with the two children, so the root page number never
/// changes.
pub fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<(), Error> {
    let left_child_page_num = table.pager.unused_page_num();
    debug!(
        left_child_page_num,
        right_child_page_num, "Creating new root"
    );

    let root_page = table.pager.get_page(table.root_page_num)?;
    let right_page = table.pager.get_page(right_child_page_num)?;
    let left_page = table.pager.get_page(left_child_page_num)?;
    let mut root = lock_page(&root_page)?;
    let mut right_child = lock_page(&right_page)?;
    let mut left_child = lock_page(&left_page)?;

    // Old root copied to the new page so the root page can be reused.
    left_child.data.copy_from_slice(&root.data);
    left_child.set_root(false);

    initialize_internal_node(&mut root);
    root.set_root(true);
    root.set_internal_num_keys(1);
    root.set_internal_child(0, left_child_page_num)?;
    let left_child_max_key = left_child.max_key()?;
    root.set_internal_key(0, left_child_max_key)?;
    root.set_internal_right_child(right_child_page_num);

    left_child.set_parent(table.root_page_num);
    right_child.set_parent(table.root_page_num);
    Ok(())
}

/// Adds a child/key pair to `parent` covering `child`.
///
/// The rightmost child pointer is stored separately from the cell array, so
/// a child whose max key exceeds the current right child's becomes the new
/// right child, with the former right child slotted into the cell array.
/// Anything else shifts the cells at and after its position one slot right.
pub fn internal_node_insert(
    table: &mut Table,
    parent_page_num: u32,
    child_page_num: u32,
) -> Result<(), Error> {
    debug!(parent_page_num, child_page_num, "Inserting into internal node");

    let parent_page = table.pager.get_page(parent_page_num)?;
    let child_page = table.pager.get_page(child_page_num)?;
    let mut parent = lock_page(&parent_page)?;
    let child = lock_page(&child_page)?;

    let child_max_key = child.max_key()?;
    drop(child);

    // The index for the new cell depends on the max key of the new child.
    let index = parent.internal_find_child(child_max_key)?;
    let original_num_keys = parent.internal_num_keys();

    if original_num_keys as usize >= INTERNAL_NODE_MAX_CELLS {
        // Splitting an internal node is not supported; the table is full.
        return Err(Error::TableFull);
    }

    let right_child_page_num = parent.internal_right_child();
    let right_page = table.pager.get_page(right_child_page_num)?;
    let right_child = lock_page(&right_page)?;
    let right_child_max_key = right_child.max_key()?;
    drop(right_child);

    parent.set_internal_num_keys(original_num_keys + 1);

    if child_max_key > right_child_max_key {
        // Replace right child
        parent.set_internal_child(original_num_keys, right_child_page_num)?;
        parent.set_internal_key(original_num_keys, right_child_max_key)?;
        parent.set_internal_right_child(child_page_num);
    } else {
        // Make room for the new cell
        let source = parent.clone();
        for i in ((index + 1)..=original_num_keys).rev() {
            parent
                .internal_cell_mut(i)?
                .copy_from_slice(source.internal_cell(i - 1)?);
        }
        parent.set_internal_child(index, child_page_num)?;
        parent.set_internal_key(index, child_max_key)?;
    }

    Ok(())
}
