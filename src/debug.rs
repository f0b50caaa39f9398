use alloc::{collections::VecDeque, string::String};
use core::{fmt, ptr::NonNull};

use crate::{Links, OrderedTree, TreeNode};

impl<T> OrderedTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Value: fmt::Display,
{
    /// Writes the shape of the tree to `w` as a graphviz digraph.
    ///
    /// Every node is labelled with its value and subtree size, one rank per tree level. Missing
    /// children are drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>, usize),
            Missing(usize),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root, 0));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        // Nodes and missing children share one id space.
        let mut next_id = 1;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _rank_node in 0..queue.len() {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let (node, id) = match item {
                    Item::Node(node, id) => (node, id),
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let (value, size) = unsafe {
                    (
                        node.as_ref().value(),
                        T::links(node).as_ref().subtree_size(),
                    )
                };
                write!(w, "\"graph{name}-{id}\" [label=\"{value}:{size}\"]; ")?;

                let children = unsafe {
                    let links = T::links(node).as_ref();
                    [links.left(), links.right()]
                };

                for child in children {
                    let child_id = next_id;
                    next_id += 1;

                    queue.push_back(match child {
                        Some(child) => Item::Node(child, child_id),
                        None => Item::Missing(child_id),
                    });

                    writeln!(links, "\"graph{name}-{id}\" -> \"graph{name}-{child_id}\";")?;
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
