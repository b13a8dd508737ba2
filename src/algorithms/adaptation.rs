use serde::{Deserialize, Serialize};

/// Sessions with at most this many minutes get the short presentation.
pub const SHORT_VISIT_MINUTES: u32 = 15;
pub const SHORT_VISIT_RESULTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    #[default]
    Good,
    Poor,
}

impl ConnectionQuality {
    /// Anything other than `poor` counts as a good connection.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "poor" => ConnectionQuality::Poor,
            _ => ConnectionQuality::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl Device {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let agent = user_agent.to_lowercase();
        if ["mobile", "android", "iphone"].iter().any(|m| agent.contains(m)) {
            Device::Mobile
        } else if ["tablet", "ipad"].iter().any(|m| agent.contains(m)) {
            Device::Tablet
        } else {
            Device::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionLength {
    #[default]
    Full,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Grid,
    List,
}

/// What is known about the visitor's session right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptationContext {
    pub connection: ConnectionQuality,
    pub time_available_minutes: u32,
    pub device: Device,
}

impl Default for AdaptationContext {
    fn default() -> Self {
        Self {
            connection: ConnectionQuality::Good,
            time_available_minutes: 60,
            device: Device::Desktop,
        }
    }
}

impl AdaptationContext {
    /// Builds a context from loosely typed client hints. A time value that is
    /// not a whole number keeps the default.
    pub fn detect(
        user_agent: Option<&str>,
        connection: Option<&str>,
        time_available: Option<&str>,
    ) -> Self {
        let mut context = Self::default();
        if let Some(agent) = user_agent {
            context.device = Device::from_user_agent(agent);
        }
        if let Some(connection) = connection {
            context.connection = ConnectionQuality::from_label(connection);
        }
        if let Some(minutes) = time_available.and_then(|raw| raw.trim().parse().ok()) {
            context.time_available_minutes = minutes;
        }
        context
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSettings {
    pub show_images: bool,
    pub max_results: usize,
    pub description_length: DescriptionLength,
    pub layout: Layout,
    pub adaptation_reasons: Vec<String>,
    #[serde(skip)]
    baseline_results: usize,
}

impl ActiveSettings {
    pub fn baseline(max_results: usize) -> Self {
        Self {
            show_images: true,
            max_results,
            description_length: DescriptionLength::Full,
            layout: Layout::Grid,
            adaptation_reasons: Vec::new(),
            baseline_results: max_results,
        }
    }

    /// Applies the bandwidth, short-visit and mobile rules in that order.
    pub fn for_context(context: &AdaptationContext, baseline_results: usize) -> Self {
        let mut settings = Self::baseline(baseline_results);

        if context.connection == ConnectionQuality::Poor {
            settings.show_images = false;
            settings.adaptation_reasons.push("connection is poor".to_string());
        }

        if context.time_available_minutes <= SHORT_VISIT_MINUTES {
            settings.max_results = SHORT_VISIT_RESULTS.min(baseline_results);
            settings.description_length = DescriptionLength::Short;
            settings
                .adaptation_reasons
                .push(format!("you have {} minutes", context.time_available_minutes));
        }

        if context.device == Device::Mobile {
            settings.layout = Layout::List;
            settings.adaptation_reasons.push("mobile device".to_string());
        }

        settings
    }

    pub fn is_adapted(&self) -> bool {
        !self.adaptation_reasons.is_empty()
    }

    /// Human-readable account of what changed and why; `None` when nothing did.
    pub fn log_message(&self) -> Option<String> {
        if !self.is_adapted() {
            return None;
        }

        let mut changes = Vec::new();
        if !self.show_images {
            changes.push("hiding images".to_string());
        }
        if self.description_length == DescriptionLength::Short {
            changes.push("shortening descriptions".to_string());
        }
        if self.max_results < self.baseline_results {
            changes.push(format!("showing {} results", self.max_results));
        }
        if self.layout == Layout::List {
            changes.push("using list layout".to_string());
        }

        let changes = if changes.is_empty() {
            "applying optimizations".to_string()
        } else {
            changes.join(" and ")
        };
        Some(format!(
            "System adapted: {} because {}.",
            capitalize(&changes),
            self.adaptation_reasons.join(" and ")
        ))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
