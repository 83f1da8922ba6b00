use std::{borrow::Borrow, cmp::Ordering, mem};

use crate::depth::Depth;
use crate::error::RbtreeError;

// Arena slot 0 is the sentinel: permanently BLACK, carries no links and
// is never written. Child and parent fields holding NIL mean "absent".
const NIL: usize = 0;

/// NodeId is an opaque handle to a single entry inside an [`Rbtree`]
/// instance. A handle stays valid until the entry it names is erased;
/// erasing other entries does not move it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Rbtree manage a single instance of in-memory index using a
/// [red-black][rbt] tree. Keys are held without associated values and
/// duplicate keys are allowed; an equal key always routes into the right
/// subtree during descent.
///
/// Nodes live in an arena owned by the tree; parent and child links are
/// plain indices into the arena, so the cyclic parent back-references
/// need no shared ownership.
///
/// [rbt]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
#[derive(Clone)]
pub struct Rbtree<K>
where
    K: Clone + Ord,
{
    name: String,
    slots: Vec<Slot<K>>,
    root: usize,
    free_head: usize,
    n_count: usize, // number of entries in the tree.
}

/// Different ways to construct a new Rbtree instance.
impl<K> Rbtree<K>
where
    K: Clone + Ord,
{
    /// Create an empty instance of Rbtree, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Rbtree<K>
    where
        S: AsRef<str>,
    {
        Rbtree {
            name: name.as_ref().to_string(),
            slots: vec![Slot::Nil],
            root: NIL,
            free_head: NIL,
            n_count: 0,
        }
    }

    /// Create a new instance of Rbtree and load it with keys from `iter`.
    pub fn load_from<S, I>(name: S, iter: I) -> Rbtree<K>
    where
        S: AsRef<str>,
        I: Iterator<Item = K>,
    {
        let mut tree = Rbtree::new(name);
        for key in iter {
            tree.insert(key);
        }
        tree
    }
}

/// Maintenance API.
impl<K> Rbtree<K>
where
    K: Clone + Ord,
{
    /// Identify this instance. Applications can choose unique names while
    /// creating Rbtree instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return quickly with basic statisics, only entries() method is valid
    /// with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K>>())
    }
}

/// Write operations on Rbtree instance.
impl<K> Rbtree<K>
where
    K: Clone + Ord,
{
    /// Insert key into the index and return a handle to the new entry.
    /// Duplicate keys are allowed; an equal key routes into the right
    /// subtree of the first equal key met on the way down.
    pub fn insert(&mut self, key: K) -> NodeId {
        let (mut parent, mut side) = (NIL, Side::Left);
        let mut cur = self.root;
        while cur != NIL {
            parent = cur;
            side = match key.cmp(&self.node(cur).key) {
                Ordering::Less => Side::Left,
                _ => Side::Right,
            };
            cur = self.child(cur, side);
        }

        let z = self.alloc(key, parent);
        if parent == NIL {
            self.root = z;
        } else {
            self.set_child(parent, side, z);
        }
        self.insert_fixup(z);
        self.n_count += 1;
        NodeId(z)
    }

    /// Remove the entry named by `id` from the index and return its key.
    /// Return `NotAMember` when `id` does not name a live entry, for
    /// instance when it was already erased.
    ///
    /// A handle whose slot has since been reused by a later insert cannot
    /// be told apart from a live handle; callers must not hold on to
    /// handles across the erase of the entry they name.
    pub fn erase(&mut self, id: NodeId) -> Result<K, RbtreeError<K>> {
        if !self.is_member(id.0) {
            return Err(RbtreeError::NotAMember);
        }
        let z = id.0;

        // `x` is the node spliced into the removed position and the
        // starting point for the fixup. `x` may be the sentinel, so its
        // parent is carried explicitly rather than written into slot 0.
        let mut y_black = self.node(z).black;
        let x;
        let x_parent;
        if self.left(z) == NIL {
            x = self.right(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else if self.right(z) == NIL {
            x = self.left(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else {
            // two children: the in-order successor takes z's place,
            // inheriting z's children and color.
            let y = self.min_from(self.right(z));
            y_black = self.node(y).black;
            x = self.right(y);
            if self.parent(y) == z {
                x_parent = y;
            } else {
                x_parent = self.parent(y);
                self.transplant(y, x);
                let zright = self.right(z);
                self.set_child(y, Side::Right, zright);
                self.set_parent(zright, y);
            }
            self.transplant(z, y);
            let zleft = self.left(z);
            self.set_child(y, Side::Left, zleft);
            self.set_parent(zleft, y);
            let zblack = self.node(z).black;
            self.node_mut(y).black = zblack;
        }

        // removing a RED node leaves every black count unchanged.
        if y_black {
            self.erase_fixup(x, x_parent);
        }
        self.n_count -= 1;
        Ok(self.reclaim(z))
    }

    /// Validate the tree with following rules:
    ///
    /// * Root node must be BLACK.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure keys are in sort-order, admitting duplicates.
    /// * Make sure every child links back to its parent.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, RbtreeError<K>> {
        if self.is_red(self.root) {
            return Err(RbtreeError::RedRoot);
        }
        if self.root != NIL && self.parent(self.root) != NIL {
            let err = format!("root: {} parent: {}", self.root, self.parent(self.root));
            return Err(RbtreeError::BrokenLink(err));
        }

        let mut stats = Stats::new(self.n_count, mem::size_of::<Node<K>>());
        stats.set_depths(Depth::new());
        let blacks = self.validate_tree(self.root, false, 0, 0, &mut stats)?;
        stats.set_blacks(blacks);

        // a binary tree with n nodes hangs exactly n+1 sentinel leaves.
        let reachable = stats.depths.as_ref().unwrap().samples();
        if reachable != self.n_count + 1 {
            let err = format!("entries: {} leaves: {}", self.n_count, reachable);
            return Err(RbtreeError::BrokenLink(err));
        }
        Ok(stats)
    }
}

/// Read operations on Rbtree instance.
impl<K> Rbtree<K>
where
    K: Clone + Ord,
{
    /// Lookup key in the index. With duplicate keys stored, the handle
    /// returned names whichever equal key is met first on the descent
    /// path, not necessarily the first or last inserted.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while cur != NIL {
            cur = match self.node(cur).key.borrow().cmp(key) {
                Ordering::Less => self.right(cur),
                Ordering::Greater => self.left(cur),
                Ordering::Equal => return Some(NodeId(cur)),
            };
        }
        None
    }

    /// Return a handle to the smallest key, or None for an empty index.
    pub fn min(&self) -> Option<NodeId> {
        match self.root {
            NIL => None,
            root => Some(NodeId(self.min_from(root))),
        }
    }

    /// Return a handle to the largest key, or None for an empty index.
    pub fn max(&self) -> Option<NodeId> {
        match self.root {
            NIL => None,
            root => Some(NodeId(self.max_from(root))),
        }
    }

    /// Return the key held by `id`, or None when `id` does not name a
    /// live entry.
    pub fn key(&self, id: NodeId) -> Option<&K> {
        match self.slots.get(id.0) {
            Some(Slot::Used(node)) => Some(&node.key),
            _ => None,
        }
    }

    /// Return a handle to the root entry, or None for an empty index.
    pub fn root(&self) -> Option<NodeId> {
        match self.root {
            NIL => None,
            root => Some(NodeId(root)),
        }
    }

    /// Write keys in sort order into `buf`, stopping once the buffer is
    /// full. Return the number of keys written, 0 for an empty index.
    pub fn to_array(&self, buf: &mut [K]) -> usize {
        let mut count = 0;
        let mut stack: Vec<usize> = vec![];
        let mut cur = self.root;
        while count < buf.len() {
            while cur != NIL {
                stack.push(cur);
                cur = self.left(cur);
            }
            match stack.pop() {
                None => break,
                Some(idx) => {
                    buf[count] = self.node(idx).key.clone();
                    count += 1;
                    cur = self.right(idx);
                }
            }
        }
        count
    }

    /// Return an iterator over all keys in this instance, in sort order.
    pub fn iter(&self) -> Iter<K> {
        Iter {
            tree: self,
            cur: match self.root {
                NIL => NIL,
                root => self.min_from(root),
            },
        }
    }
}

impl<K> Rbtree<K>
where
    K: Clone + Ord,
{
    fn insert_fixup(&mut self, mut z: usize) {
        // z starts RED; loop while its parent is RED too.
        while self.is_red(self.parent(z)) {
            let parent = self.parent(z);
            let grand = self.parent(parent);
            let side = if parent == self.child(grand, Side::Left) {
                Side::Left
            } else {
                Side::Right
            };
            let uncle = self.child(grand, side.flip());
            if self.is_red(uncle) {
                // red uncle: recolor and push the violation upward.
                self.set_black(parent);
                self.set_black(uncle);
                self.set_red(grand);
                z = grand;
            } else {
                if z == self.child(parent, side.flip()) {
                    // inner grandchild: straighten the zig-zag first.
                    z = parent;
                    self.rotate(z, side);
                }
                // outer grandchild: recolor and rotate the grandparent.
                let parent = self.parent(z);
                let grand = self.parent(parent);
                self.set_black(parent);
                self.set_red(grand);
                self.rotate(grand, side.flip());
            }
        }
        let root = self.root;
        self.set_black(root);
    }

    // `x` carries the extra unit of blackness left behind by a spliced
    // BLACK node, `parent` names x's position since x may be the
    // sentinel. Case ordering follows the classic four-case machine.
    fn erase_fixup(&mut self, mut x: usize, mut parent: usize) {
        while x != self.root && self.is_black(x) {
            let side = if x == self.child(parent, Side::Left) {
                Side::Left
            } else {
                Side::Right
            };
            let mut w = self.child(parent, side.flip());
            if self.is_red(w) {
                // case 1: red sibling, rotate to expose a black one.
                self.set_black(w);
                self.set_red(parent);
                self.rotate(parent, side);
                w = self.child(parent, side.flip());
            }
            let near = self.child(w, side);
            let far = self.child(w, side.flip());
            if self.is_black(near) && self.is_black(far) {
                // case 2: push the extra blackness up to the parent.
                self.set_red(w);
                x = parent;
                parent = self.parent(x);
            } else {
                if self.is_black(far) {
                    // case 3: red near child, straighten toward case 4.
                    self.set_black(near);
                    self.set_red(w);
                    self.rotate(w, side.flip());
                    w = self.child(parent, side.flip());
                }
                // case 4: red far child absorbs the extra blackness.
                let pblack = self.node(parent).black;
                self.node_mut(w).black = pblack;
                self.set_black(parent);
                let far = self.child(w, side.flip());
                self.set_black(far);
                self.rotate(parent, side);
                x = self.root;
            }
        }
        self.set_black(x);
    }

    //              (p)                      (p)
    //               |                        |
    //              node                      y
    //              /  \                     / \
    //             /    \                   /   \
    //            a      y               node    c
    //                  / \              /  \
    //                 b   c            a    b
    //
    // rotate(node, Left) promotes the right child as drawn above;
    // rotate(node, Right) is the mirror image. In-order sequence is
    // preserved and no color changes.
    fn rotate(&mut self, x: usize, dir: Side) {
        let y = self.child(x, dir.flip());
        if y == NIL {
            panic!("rotate(): no child to promote? call the programmer");
        }
        let inner = self.child(y, dir);
        self.set_child(x, dir.flip(), inner);
        if inner != NIL {
            self.set_parent(inner, x);
        }
        let p = self.parent(x);
        self.set_parent(y, p);
        if p == NIL {
            self.root = y;
        } else if self.child(p, Side::Left) == x {
            self.set_child(p, Side::Left, y);
        } else {
            self.set_child(p, Side::Right, y);
        }
        self.set_child(y, dir, x);
        self.set_parent(x, y);
    }

    // replace the subtree rooted at `u` with the one rooted at `v`,
    // fixing only the incident links. `v` may be the sentinel.
    fn transplant(&mut self, u: usize, v: usize) {
        let p = self.parent(u);
        if p == NIL {
            self.root = v;
        } else if u == self.child(p, Side::Left) {
            self.set_child(p, Side::Left, v);
        } else {
            self.set_child(p, Side::Right, v);
        }
        if v != NIL {
            self.set_parent(v, p);
        }
    }

    fn validate_tree(
        &self,
        idx: usize,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        stats: &mut Stats,
    ) -> Result<usize, RbtreeError<K>> {
        if idx == NIL {
            stats.depths.as_mut().unwrap().sample(depth);
            return Ok(nb);
        }

        let node = self.node(idx);
        let red = !node.black;
        if fromred && red {
            return Err(RbtreeError::ConsecutiveReds);
        }
        if !red {
            nb += 1;
        }
        for child in [node.left, node.right].iter().cloned() {
            if child != NIL && self.parent(child) != idx {
                let err = format!("node: {} child: {}", idx, child);
                return Err(RbtreeError::BrokenLink(err));
            }
        }
        let lblacks = self.validate_tree(node.left, red, nb, depth + 1, stats)?;
        let rblacks = self.validate_tree(node.right, red, nb, depth + 1, stats)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(RbtreeError::UnbalancedBlacks(err));
        }
        if node.left != NIL {
            // an equal key can rotate into the left child position.
            let left = self.node(node.left);
            if left.key.gt(&node.key) {
                let (lkey, parent) = (left.key.clone(), node.key.clone());
                return Err(RbtreeError::SortError(lkey, parent));
            }
        }
        if node.right != NIL {
            let right = self.node(node.right);
            if right.key.lt(&node.key) {
                let (rkey, parent) = (right.key.clone(), node.key.clone());
                return Err(RbtreeError::SortError(rkey, parent));
            }
        }
        Ok(lblacks)
    }

    //--------- arena plumbing ----------------

    fn alloc(&mut self, key: K, parent: usize) -> usize {
        let node = Node {
            key,
            black: false, // new nodes start RED
            parent,
            left: NIL,
            right: NIL,
        };
        if self.free_head == NIL {
            self.slots.push(Slot::Used(node));
            self.slots.len() - 1
        } else {
            let idx = self.free_head;
            self.free_head = match &self.slots[idx] {
                Slot::Free { next } => *next,
                _ => panic!("alloc(): free list corrupt? call the programmer"),
            };
            self.slots[idx] = Slot::Used(node);
            idx
        }
    }

    fn reclaim(&mut self, idx: usize) -> K {
        let next = self.free_head;
        match mem::replace(&mut self.slots[idx], Slot::Free { next }) {
            Slot::Used(node) => {
                self.free_head = idx;
                node.key
            }
            _ => panic!("reclaim(): reclaiming a vacant slot? call the programmer"),
        }
    }

    fn is_member(&self, idx: usize) -> bool {
        match self.slots.get(idx) {
            Some(Slot::Used(_)) => true,
            _ => false,
        }
    }

    fn node(&self, idx: usize) -> &Node<K> {
        match &self.slots[idx] {
            Slot::Used(node) => node,
            _ => panic!("node(): dangling index? call the programmer"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K> {
        match &mut self.slots[idx] {
            Slot::Used(node) => node,
            _ => panic!("node_mut(): dangling index? call the programmer"),
        }
    }

    #[inline]
    fn left(&self, idx: usize) -> usize {
        self.node(idx).left
    }

    #[inline]
    fn right(&self, idx: usize) -> usize {
        self.node(idx).right
    }

    #[inline]
    fn parent(&self, idx: usize) -> usize {
        self.node(idx).parent
    }

    #[inline]
    fn child(&self, idx: usize, side: Side) -> usize {
        match side {
            Side::Left => self.node(idx).left,
            Side::Right => self.node(idx).right,
        }
    }

    #[inline]
    fn set_child(&mut self, idx: usize, side: Side, to: usize) {
        match side {
            Side::Left => self.node_mut(idx).left = to,
            Side::Right => self.node_mut(idx).right = to,
        }
    }

    #[inline]
    fn set_parent(&mut self, idx: usize, to: usize) {
        self.node_mut(idx).parent = to;
    }

    #[inline]
    fn is_red(&self, idx: usize) -> bool {
        idx != NIL && !self.node(idx).black
    }

    #[inline]
    fn is_black(&self, idx: usize) -> bool {
        !self.is_red(idx)
    }

    #[inline]
    fn set_black(&mut self, idx: usize) {
        // the sentinel is BLACK already and is never written.
        if idx != NIL {
            self.node_mut(idx).black = true;
        }
    }

    #[inline]
    fn set_red(&mut self, idx: usize) {
        if idx == NIL {
            panic!("set_red(): reddening the sentinel? call the programmer");
        }
        self.node_mut(idx).black = false;
    }

    fn min_from(&self, mut idx: usize) -> usize {
        while self.left(idx) != NIL {
            idx = self.left(idx);
        }
        idx
    }

    fn max_from(&self, mut idx: usize) -> usize {
        while self.right(idx) != NIL {
            idx = self.right(idx);
        }
        idx
    }

    fn successor(&self, mut idx: usize) -> usize {
        if self.right(idx) != NIL {
            return self.min_from(self.right(idx));
        }
        let mut p = self.parent(idx);
        while p != NIL && idx == self.right(p) {
            idx = p;
            p = self.parent(p);
        }
        p
    }
}

#[derive(Clone)]
enum Slot<K>
where
    K: Clone + Ord,
{
    Nil,
    Free { next: usize },
    Used(Node<K>),
}

// Node corresponds to a single entry in the arena. Links are arena
// indices, NIL standing in for an absent child or parent.
#[derive(Clone)]
struct Node<K>
where
    K: Clone + Ord,
{
    key: K,
    black: bool, // store: black or red
    parent: usize,
    left: usize,
    right: usize,
}

/// Iter over all keys in an [`Rbtree`] instance, in sort order. Walks
/// the parent links, so it needs no allocation.
pub struct Iter<'a, K>
where
    K: Clone + Ord,
{
    tree: &'a Rbtree<K>,
    cur: usize,
}

impl<'a, K> Iterator for Iter<'a, K>
where
    K: Clone + Ord,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cur {
            NIL => None,
            cur => {
                self.cur = self.tree.successor(cur);
                Some(&self.tree.node(cur).key)
            }
        }
    }
}

/// Statistics on [`Rbtree`] instance. Serves two purpose:
///
/// * To get partial but quick statistics via [`Rbtree::stats`] method.
/// * To get full statisics via [`Rbtree::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`Rbtree`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size for `Rbtree<K>`. The overhead over the key is
    /// constant, three links and the color flag.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf, on both left
    /// and right child.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics.
    pub fn depths(&self) -> Option<Depth> {
        if self.depths.as_ref().unwrap().samples() == 0 {
            None
        } else {
            self.depths.clone()
        }
    }
}
