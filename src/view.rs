//! Active-view bookkeeping for the application shell.

/// The three top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    Explorer,
    Predict,
}

impl View {
    pub const ALL: [View; 3] = [View::Chat, View::Explorer, View::Predict];

    /// Title shown in the header bar.
    pub fn title(self) -> &'static str {
        match self {
            View::Chat => "AI Assistant & SPARQL Generator",
            View::Explorer => "Knowledge Graph Explorer",
            View::Predict => "Tour Recommendation Engine",
        }
    }

    /// Short label for the navigation tabs.
    pub fn label(self) -> &'static str {
        match self {
            View::Chat => "Chat",
            View::Explorer => "Explorer",
            View::Predict => "Predict",
        }
    }
}

/// Owns which view is active. Switching only changes what is displayed; the
/// orchestrators keep their state and are never torn down.
#[derive(Debug, Default)]
pub struct ViewController {
    current: View,
}

impl ViewController {
    pub fn current(&self) -> View {
        self.current
    }

    pub fn switch_to(&mut self, view: View) {
        self.current = view;
    }

    pub fn title(&self) -> &'static str {
        self.current.title()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_view_is_chat() {
        let views = ViewController::default();
        assert_eq!(views.current(), View::Chat);
        assert_eq!(views.title(), "AI Assistant & SPARQL Generator");
    }

    #[test]
    fn switching_updates_view_and_title() {
        let mut views = ViewController::default();
        views.switch_to(View::Predict);
        assert_eq!(views.current(), View::Predict);
        assert_eq!(views.title(), "Tour Recommendation Engine");

        views.switch_to(View::Explorer);
        assert_eq!(views.title(), "Knowledge Graph Explorer");
    }
}
