//! [`Container`]: the structural node the TUI root is built from — a
//! vertical stack of child components.

use crate::component::Component;

#[derive(Default)]
pub struct Container {
    children: Vec<Box<dyn Component>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, child: Box<dyn Component>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Component for Container {
    fn render(&self, width: u16) -> Vec<String> {
        self.children.iter().flat_map(|child| child.render(width)).collect()
    }

    fn invalidate(&mut self) {
        for child in &mut self.children {
            child.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<&'static str>);
    impl Component for Fixed {
        fn render(&self, _width: u16) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn stacks_children_in_order() {
        let mut container = Container::new();
        container.push(Box::new(Fixed(vec!["a", "b"])));
        container.push(Box::new(Fixed(vec!["c"])));
        assert_eq!(container.render(80), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_container_renders_no_lines() {
        let container = Container::new();
        assert!(container.render(80).is_empty());
    }
}
