//! Objects: templates recorded once and stamped onto a range of pages.
//!
//! An object is recorded between [`open_object`](Canvas::open_object) and
//! [`close_object`](Canvas::close_object), then registered with a placement rule by
//! [`add_object`](Canvas::add_object). Registered objects are placed on each page as it
//! is left, for as long as they stay registered; [`stop_object`](Canvas::stop_object)
//! places an object one last time and unregisters it.

use crate::canvas::Canvas;
use crate::engine::{Engine, TemplateHandle};
use crate::error::CanvasError;
use std::collections::BTreeMap;

/// Which pages a registered object is placed on
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlacementRule {
    /// Only the page it starts on
    Add,
    All,
    Odd,
    Even,
    /// Unrecognised rules, and objects that were never added
    Never,
}

impl PlacementRule {
    /// Parse a placement rule. A leading `next` moves the start page on by one and
    /// is stripped; on its own it means `all`. Returns the rule and whether `next` was
    /// present. Unknown rules never place anything.
    pub fn parse(rule: &str) -> (PlacementRule, bool) {
        let rule = rule.trim();
        let (rule, next) = match rule.strip_prefix("next") {
            Some(rest) => (rest, true),
            None => (rule, false),
        };
        let rule = match rule {
            "" if next => PlacementRule::All,
            "add" => PlacementRule::Add,
            "all" => PlacementRule::All,
            "odd" => PlacementRule::Odd,
            "even" => PlacementRule::Even,
            _ => PlacementRule::Never,
        };
        (rule, next)
    }

    /// Whether an object registered from `start_page` goes on `page`
    pub fn applies(self, page: u32, start_page: u32) -> bool {
        if page < start_page {
            return false;
        }
        match self {
            PlacementRule::Add => page == start_page,
            PlacementRule::All => true,
            PlacementRule::Odd => page % 2 == 1,
            PlacementRule::Even => page % 2 == 0,
            PlacementRule::Never => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegisteredObject {
    pub start_page: u32,
    pub rule: PlacementRule,
}

impl RegisteredObject {
    pub fn applies(&self, page: u32) -> bool {
        self.rule.applies(page, self.start_page)
    }
}

/// Objects waiting to be placed, and the one being recorded
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<TemplateHandle, RegisteredObject>,
    recording: Option<TemplateHandle>,
}

impl ObjectRegistry {
    pub fn new() -> ObjectRegistry {
        ObjectRegistry::default()
    }

    /// Register an object being opened on `start_page`. It places nothing until a rule
    /// is set.
    pub fn open(&mut self, object: TemplateHandle, start_page: u32) {
        self.objects.insert(
            object,
            RegisteredObject {
                start_page,
                rule: PlacementRule::Never,
            },
        );
        self.recording = Some(object);
    }

    pub fn recording(&self) -> Option<TemplateHandle> {
        self.recording
    }

    /// Record into an existing object again, keeping its registration
    fn resume_recording(&mut self, object: TemplateHandle) {
        self.recording = Some(object);
    }

    fn finish_recording(&mut self) {
        self.recording = None;
    }

    pub fn get(&self, object: TemplateHandle) -> Option<&RegisteredObject> {
        self.objects.get(&object)
    }

    /// Apply a placement rule to a registered object
    pub fn set_rule(&mut self, object: TemplateHandle, rule: &str) -> Result<(), CanvasError> {
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(CanvasError::UnknownObject(object))?;
        let (rule, next) = PlacementRule::parse(rule);
        if next {
            entry.start_page += 1;
        }
        entry.rule = rule;
        Ok(())
    }

    pub fn remove(&mut self, object: TemplateHandle) -> Option<RegisteredObject> {
        self.objects.remove(&object)
    }

    /// Objects that go on `page`, oldest first
    pub fn eligible(&self, page: u32) -> Vec<TemplateHandle> {
        self.objects
            .iter()
            .filter(|(_, object)| object.applies(page))
            .map(|(&handle, _)| handle)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<E: Engine> Canvas<E> {
    /// Start recording a new object the size of the page. Drawing goes to the object
    /// until it is closed.
    pub fn open_object(&mut self) -> Result<TemplateHandle, CanvasError> {
        self.ensure_open()?;
        self.suspend()?;
        let object = self.engine.begin_template(self.width, self.height)?;
        self.engine.save()?;
        self.objects.open(object, self.page_number);
        log::debug!("recording object {object} from page {}", self.page_number);
        Ok(object)
    }

    /// Stop recording an object and go back to the page that was being drawn on
    pub fn close_object(&mut self, object: TemplateHandle) -> Result<(), CanvasError> {
        self.ensure_open()?;
        if self.objects.recording() != Some(object) {
            return Err(CanvasError::UnknownObject(object));
        }
        self.engine.restore()?;
        self.engine.end_template()?;
        self.objects.finish_recording();
        self.resume()
    }

    /// Record more content into a closed object. Only engines that can re-open templates
    /// support this.
    pub fn reopen_object(&mut self, object: TemplateHandle) -> Result<(), CanvasError> {
        self.ensure_open()?;
        if !self.capabilities.reopen_templates {
            return Err(CanvasError::Unsupported {
                operation: "reopen_object",
            });
        }
        self.suspend()?;
        self.engine.reopen_template(object)?;
        self.engine.save()?;
        self.objects.resume_recording(object);
        Ok(())
    }

    /// Register an object for placement on the pages `rule` selects: `add`, `all`,
    /// `odd`, `even`, optionally prefixed with `next` to start from the following page.
    pub fn add_object(&mut self, object: TemplateHandle, rule: &str) -> Result<(), CanvasError> {
        self.ensure_open()?;
        self.objects.set_rule(object, rule)?;
        log::debug!("object {object} placed by rule '{rule}'");
        Ok(())
    }

    /// Place an object on the current page if its rule says so, then unregister it.
    /// Stopping an unregistered object does nothing.
    pub fn stop_object(&mut self, object: TemplateHandle) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let Some(registered) = self.objects.remove(object) else {
            return Ok(());
        };
        if registered.applies(self.page_number) {
            self.place_object(object)?;
        }
        log::debug!("stopped object {object} on page {}", self.page_number);
        Ok(())
    }

    fn place_object(&mut self, object: TemplateHandle) -> Result<(), CanvasError> {
        self.engine
            .place_template(object, 0.0, 0.0, self.width, self.height)?;
        Ok(())
    }

    /// Place every registered object whose rule covers the current page. Objects stay
    /// registered.
    pub(crate) fn place_pending(&mut self) -> Result<(), CanvasError> {
        for object in self.objects.eligible(self.page_number) {
            log::trace!("placing object {object} on page {}", self.page_number);
            self.place_object(object)?;
        }
        Ok(())
    }
}
