//! # B-Tree node layout
//!
//! Every page is interpreted as a B-tree node. A node is either a leaf
//! (key/row cells plus a forward sibling pointer) or an internal node
//! (child-pointer/separator-key cells plus a distinguished right child).
//! All fields live at fixed byte offsets inside the 4096-byte page buffer;
//! the accessors below are the only code that touches those offsets.
//!
//! | **Property**            | **Internal Node**              | **Leaf Node**       |
//! |-------------------------|--------------------------------|---------------------|
//! | **Stores**              | Keys and pointers to children  | Keys and values     |
//! | **Number of pointers**  | Number of keys + 1             | One sibling pointer |
//! | **Stores values?**      | No                             | Yes                 |

use super::row::ROW_SIZE;
use crate::errors::Error;

/// Page size of 4 kilobytes, the same size as a page used in the virtual
/// memory systems of most computer architectures.
pub const PAGE_SIZE: usize = 4096;

// Common Node Header Layout

/// Offset of the node type field (starts at 0).
const NODE_TYPE_OFFSET: usize = 0;
/// Size of the node type field (1 byte).
const NODE_TYPE_SIZE: usize = std::mem::size_of::<u8>();
/// Offset of the is_root flag (after node type).
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
/// Size of the is_root flag (1 byte).
const IS_ROOT_SIZE: usize = std::mem::size_of::<u8>();
/// Offset of the parent page number (after is_root).
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
/// Size of the parent page number (4 bytes).
const PARENT_POINTER_SIZE: usize = std::mem::size_of::<u32>();
/// Total size of the common node header.
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf Node Header Layout

/// Size of the num_cells field (4 bytes).
const LEAF_NODE_NUM_CELLS_SIZE: usize = std::mem::size_of::<u32>();
/// Offset of the num_cells field (after the common header).
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
/// Size of the next_leaf sibling pointer (4 bytes).
const LEAF_NODE_NEXT_LEAF_SIZE: usize = std::mem::size_of::<u32>();
/// Offset of the next_leaf sibling pointer (after num_cells).
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
/// Total size of the leaf node header.
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf Node Body Layout

/// Size of the key field in a leaf cell (4 bytes).
const LEAF_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
/// Size of the value (row) region in a leaf cell.
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
/// Total size of a leaf cell (key + row).
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
/// Space available for cells in a leaf node (page size minus header).
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
/// Maximum number of cells that fit in a leaf node.
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

// Leaf Node Split Counts
//
// The existing cells plus the new one are divided evenly between the two
// sibling nodes; when N+1 is odd the left node takes the extra cell.

/// Number of cells assigned to the right sibling when splitting a leaf.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
/// Number of cells assigned to the left sibling when splitting a leaf.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal Node Header Layout

/// Size of the num_keys field (4 bytes).
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = std::mem::size_of::<u32>();
/// Offset of the num_keys field (after the common header).
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
/// Size of the right_child field (4 bytes).
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = std::mem::size_of::<u32>();
/// Offset of the right_child field (after num_keys).
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
/// Total size of an internal node header.
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal Node Body Layout

/// Size of a child pointer in an internal cell (4 bytes).
const INTERNAL_NODE_CHILD_SIZE: usize = std::mem::size_of::<u32>();
/// Size of a separator key in an internal cell (4 bytes).
const INTERNAL_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
/// Total size of an internal cell (child pointer + key).
const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// Maximum number of cells in an internal node. Kept intentionally tiny so
/// that tree-depth behavior is exercised after a handful of inserts.
pub const INTERNAL_NODE_MAX_CELLS: usize = 3;

/// Discriminates the two node kinds stored in a page.
///
/// The on-disk tag is a single byte: 0 for internal, 1 for leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

impl NodeType {
    fn from_byte(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            invalid => Err(err!(Storage, "Invalid node type value: {}", invalid)),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            NodeType::Internal => 0,
            NodeType::Leaf => 1,
        }
    }
}

/// One 4096-byte page, interpreted as a B-tree node.
#[derive(Clone, Debug)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    /// A zeroed page. The engine always initializes a fresh page as a leaf
    /// or internal node before first use.
    pub fn new() -> Self {
        Page {
            data: [0u8; PAGE_SIZE],
        }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // Common header accessors

    pub fn node_type(&self) -> Result<NodeType, Error> {
        NodeType::from_byte(self.data[NODE_TYPE_OFFSET])
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.data[NODE_TYPE_OFFSET] = node_type.as_byte();
    }

    pub fn is_root(&self) -> bool {
        self.data[IS_ROOT_OFFSET] == 1
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.data[IS_ROOT_OFFSET] = is_root as u8;
    }

    /// Parent page number. Meaningful only for non-root nodes; plain 32-bit
    /// data inside the page, a page is only ever reached by number.
    pub fn parent(&self) -> u32 {
        self.read_u32(PARENT_POINTER_OFFSET)
    }

    pub fn set_parent(&mut self, parent_page_num: u32) {
        self.write_u32(PARENT_POINTER_OFFSET, parent_page_num);
    }

    // Leaf node accessors

    pub fn leaf_num_cells(&self) -> u32 {
        self.read_u32(LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_leaf_num_cells(&mut self, num_cells: u32) {
        self.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, num_cells);
    }

    /// Forward sibling pointer; 0 means "no right sibling" (page 0 is
    /// always the root, so it can never be a sibling).
    pub fn leaf_next_leaf(&self) -> u32 {
        self.read_u32(LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    pub fn set_leaf_next_leaf(&mut self, page_num: u32) {
        self.write_u32(LEAF_NODE_NEXT_LEAF_OFFSET, page_num);
    }

    fn leaf_cell_offset(&self, cell_num: usize) -> Result<usize, Error> {
        if cell_num >= LEAF_NODE_MAX_CELLS {
            return Err(err!(
                Storage,
                "Leaf cell number out of bounds (cell_num={}, max_cells={})",
                cell_num,
                LEAF_NODE_MAX_CELLS
            ));
        }
        Ok(LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE)
    }

    /// The whole i-th cell (key plus row bytes).
    pub fn leaf_cell(&self, cell_num: usize) -> Result<&[u8], Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_cell_mut(&mut self, cell_num: usize) -> Result<&mut [u8], Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        Ok(&mut self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_key(&self, cell_num: usize) -> Result<u32, Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        Ok(self.read_u32(offset))
    }

    pub fn set_leaf_key(&mut self, cell_num: usize, key: u32) -> Result<(), Error> {
        let offset = self.leaf_cell_offset(cell_num)?;
        self.write_u32(offset, key);
        Ok(())
    }

    /// The row region of the i-th cell.
    pub fn leaf_value(&self, cell_num: usize) -> Result<&[u8], Error> {
        let offset = self.leaf_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        Ok(&self.data[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    pub fn leaf_value_mut(&mut self, cell_num: usize) -> Result<&mut [u8], Error> {
        let offset = self.leaf_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        Ok(&mut self.data[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    // Internal node accessors

    pub fn internal_num_keys(&self) -> u32 {
        self.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_internal_num_keys(&mut self, num_keys: u32) {
        self.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
    }

    /// Page of the subtree whose keys are strictly greater than the last
    /// separator key.
    pub fn internal_right_child(&self) -> u32 {
        self.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_internal_right_child(&mut self, page_num: u32) {
        self.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
    }

    fn internal_cell_offset(&self, cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= INTERNAL_NODE_MAX_CELLS {
            return Err(err!(
                Storage,
                "Internal cell number out of bounds (cell_num={}, max_cells={})",
                cell_num,
                INTERNAL_NODE_MAX_CELLS
            ));
        }
        Ok(INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE)
    }

    pub fn internal_cell(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = self.internal_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + INTERNAL_NODE_CELL_SIZE])
    }

    pub fn internal_cell_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = self.internal_cell_offset(cell_num)?;
        Ok(&mut self.data[offset..offset + INTERNAL_NODE_CELL_SIZE])
    }

    /// Child pointer at the given index. `child_num == num_keys` addresses
    /// the right child.
    pub fn internal_child(&self, child_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_num_keys();
        if child_num > num_keys {
            return Err(err!(
                Storage,
                "Tried to access child_num {} > num_keys {}",
                child_num,
                num_keys
            ));
        }
        if child_num == num_keys {
            Ok(self.internal_right_child())
        } else {
            let offset = self.internal_cell_offset(child_num)?;
            Ok(self.read_u32(offset))
        }
    }

    pub fn set_internal_child(&mut self, child_num: u32, page_num: u32) -> Result<(), Error> {
        let num_keys = self.internal_num_keys();
        if child_num > num_keys {
            return Err(err!(
                Storage,
                "Tried to access child_num {} > num_keys {}",
                child_num,
                num_keys
            ));
        }
        if child_num == num_keys {
            self.set_internal_right_child(page_num);
        } else {
            let offset = self.internal_cell_offset(child_num)?;
            self.write_u32(offset, page_num);
        }
        Ok(())
    }

    pub fn internal_key(&self, key_num: u32) -> Result<u32, Error> {
        let offset = self.internal_cell_offset(key_num)? + INTERNAL_NODE_CHILD_SIZE;
        Ok(self.read_u32(offset))
    }

    pub fn set_internal_key(&mut self, key_num: u32, key: u32) -> Result<(), Error> {
        let offset = self.internal_cell_offset(key_num)? + INTERNAL_NODE_CHILD_SIZE;
        self.write_u32(offset, key);
        Ok(())
    }

    /// For an internal node the max key is always its last separator key;
    /// for a leaf node it is the key at the highest index.
    pub fn max_key(&self) -> Result<u32, Error> {
        match self.node_type()? {
            NodeType::Internal => self.internal_key(self.internal_num_keys() - 1),
            NodeType::Leaf => self.leaf_key(self.leaf_num_cells() as usize - 1),
        }
    }

    /// Binary-search the separator keys for the index of the first key
    /// greater than or equal to `key`. Returns `num_keys` when every
    /// separator is smaller, i.e. the right child.
    pub fn internal_find_child(&self, key: u32) -> Result<u32, Error> {
        let num_keys = self.internal_num_keys();

        let mut min_index = 0u32;
        let mut max_index = num_keys;
        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = self.internal_key(index)?;
            if key_to_right >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        Ok(min_index)
    }

    /// Replaces the separator that covered `old_key` with `new_key`.
    pub fn update_internal_key(&mut self, old_key: u32, new_key: u32) -> Result<(), Error> {
        let old_child_index = self.internal_find_child(old_key)?;
        self.set_internal_key(old_child_index, new_key)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}
