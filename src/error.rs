/// RbtreeError enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq)]
pub enum RbtreeError<K>
where
    K: Clone + Ord,
{
    /// Fatal case, a RED node has a RED child.
    ConsecutiveReds,
    /// Fatal case, black count differs between sibling subtrees. The
    /// String component of this variant can be used for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    SortError(K, K),
    /// Fatal case, the root node is RED.
    RedRoot,
    /// Fatal case, a child's parent link does not point back at its
    /// parent. The String component can be used for debugging.
    BrokenLink(String),
    /// Returned by erase() API when the node reference is not a live
    /// member of this tree.
    NotAMember,
}
