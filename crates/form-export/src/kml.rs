//! Placemark export.
//!
//! A record yields one placemark when the location field is top-level, or one
//! placemark per instance of the repeat group holding the location. The title
//! and image fields must sit next to the location or at the top level, so
//! every placemark can resolve them from either its own instance or the
//! record.

use std::io::Write;

use form_model::{
    ColumnSelection, ElementId, FieldType, FieldValue, FlattenRepeats, FormDefinition,
    FormElement, GeoPoint, RepeatCallback, Row, Submission, SubmissionSet, Traversal,
    TraversalError,
};
use tracing::debug;

use crate::element::KmlElementFormatter;
use crate::error::{AnchorRole, ExportError, KmlConfigError};
use crate::format::SubmissionFormatter;
use crate::link::LinkBuilder;
use crate::templates::{
    DATA_VARIABLE, IMAGE_VARIABLE, KmlTemplates, PlacemarkParts, TITLE_VARIABLE, TemplateError,
};

/// Fields that position and label each placemark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmlAnchors {
    pub location: ElementId,
    pub title: ElementId,
    pub image: Option<ElementId>,
}

pub struct KmlFormatter<'a, W: Write> {
    form: &'a FormDefinition,
    anchors: KmlAnchors,
    location_group: ElementId,
    title_in_repeat: bool,
    image_in_repeat: bool,
    columns: ColumnSelection,
    links: LinkBuilder,
    elements: KmlElementFormatter,
    templates: KmlTemplates,
    output: W,
}

impl<'a, W: Write> KmlFormatter<'a, W> {
    pub fn new(
        form: &'a FormDefinition,
        base_url: &str,
        anchors: KmlAnchors,
        output: W,
        mut columns: ColumnSelection,
    ) -> Result<Self, KmlConfigError> {
        let location = anchor_field(form, AnchorRole::Location, anchors.location)?;
        if location.field_type() != Some(FieldType::GeoPoint) {
            return Err(KmlConfigError::LocationNotGeoPoint {
                path: form.path(location.id()),
            });
        }
        let location_group = match location.parent() {
            Some(parent) if parent == form.root() || form[parent].is_repeat() => parent,
            _ => {
                return Err(KmlConfigError::LocationOutsideRepeat {
                    path: form.path(location.id()),
                });
            }
        };

        let title_in_repeat = co_located(form, AnchorRole::Title, anchors.title, location_group)?;
        let image_in_repeat = match anchors.image {
            Some(image) => co_located(form, AnchorRole::Image, image, location_group)?,
            None => false,
        };

        columns.require(location_group);
        let links = LinkBuilder::new(base_url)?;
        Ok(Self {
            form,
            anchors,
            location_group,
            title_in_repeat,
            image_in_repeat,
            columns,
            elements: KmlElementFormatter::new(links.clone()),
            links,
            templates: KmlTemplates::new()?,
            output,
        })
    }

    /// Element whose instances each become a placemark; the root when the
    /// location is top-level.
    pub fn location_group(&self) -> ElementId {
        self.location_group
    }

    pub fn title_in_repeat(&self) -> bool {
        self.title_in_repeat
    }

    pub fn image_in_repeat(&self) -> bool {
        self.image_in_repeat
    }

    /// Render every placemark of one record without touching the output.
    pub fn render_submission(
        &self,
        submission: &Submission,
    ) -> Result<(String, usize), ExportError> {
        let traversal = Traversal::new(self.form, &self.columns, &self.elements);
        let record = submission.set();
        let id = submission.key().as_str();
        let mut placemarks = String::new();

        if self.location_group == self.form.root() {
            let row = traversal.render(record, &mut FlattenRepeats)?;
            placemarks.push_str(&self.placemark(
                &row,
                id,
                title(record, self.anchors.title).as_deref(),
                image_url(record, self.anchors.image, &self.links).as_deref(),
                geo_point(record, self.anchors.location),
            )?);
            return Ok((placemarks, 1));
        }

        let mut collector = PlacemarkCollector {
            anchors: &self.anchors,
            links: &self.links,
            location_group: self.location_group,
            title_in_repeat: self.title_in_repeat,
            image_in_repeat: self.image_in_repeat,
            candidates: Vec::new(),
        };
        traversal.render(record, &mut collector)?;

        let candidates = collector.candidates;
        debug!(
            submission = %submission.key(),
            placemarks = candidates.len(),
            "collected repeat placemarks"
        );
        for candidate in &candidates {
            let name = if self.title_in_repeat {
                candidate.title.clone()
            } else {
                title(record, self.anchors.title)
            };
            let image = if self.image_in_repeat {
                candidate.image_url.clone()
            } else {
                image_url(record, self.anchors.image, &self.links)
            };
            placemarks.push_str(&self.placemark(
                &candidate.row,
                id,
                name.as_deref(),
                image.as_deref(),
                candidate.location,
            )?);
        }
        Ok((placemarks, candidates.len()))
    }

    fn placemark(
        &self,
        row: &Row,
        id: &str,
        title: Option<&str>,
        image_url: Option<&str>,
        location: Option<GeoPoint>,
    ) -> Result<String, TemplateError> {
        let title_data = title
            .map(|title| self.templates.data_element(TITLE_VARIABLE, title))
            .transpose()?
            .unwrap_or_default();
        let image_data = image_url
            .map(|url| self.templates.data_element(IMAGE_VARIABLE, url))
            .transpose()?
            .unwrap_or_default();
        let data = if row.is_empty() {
            String::new()
        } else {
            let table = self.templates.data_table(row.formatted_values())?;
            self.templates.data_element(DATA_VARIABLE, &table)?
        };
        let geometry = location
            .and_then(|point| point.coordinates())
            .map(|coordinates| self.templates.point(coordinates))
            .transpose()?
            .unwrap_or_default();

        self.templates.placemark(&PlacemarkParts {
            id,
            name: title.unwrap_or_default(),
            title: &title_data,
            image: &image_data,
            data: &data,
            geometry: &geometry,
        })
    }
}

impl<W: Write> SubmissionFormatter for KmlFormatter<'_, W> {
    fn begin(&mut self) -> Result<(), ExportError> {
        let preamble = self
            .templates
            .preamble(self.form.form_id(), self.form.title())?;
        let style = self.templates.style(self.anchors.image.is_some())?;
        self.output.write_all(preamble.as_bytes())?;
        self.output.write_all(style.as_bytes())?;
        Ok(())
    }

    fn format_submission(&mut self, submission: &Submission) -> Result<usize, ExportError> {
        let (placemarks, count) = self.render_submission(submission)?;
        self.output.write_all(placemarks.as_bytes())?;
        debug!(submission = %submission.key(), placemarks = count, "wrote record");
        Ok(count)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.output.write_all(self.templates.postamble().as_bytes())?;
        self.output.flush()?;
        Ok(())
    }
}

/// One placemark found while walking a record's location repeat group.
#[derive(Debug, Clone, PartialEq)]
struct PlacemarkCandidate {
    location: Option<GeoPoint>,
    title: Option<String>,
    image_url: Option<String>,
    row: Row,
}

/// Repeat callback for one record. Instances of the location group become
/// candidates built on a copy of the enclosing row; other repeat groups are
/// merged into the enclosing row.
struct PlacemarkCollector<'f> {
    anchors: &'f KmlAnchors,
    links: &'f LinkBuilder,
    location_group: ElementId,
    title_in_repeat: bool,
    image_in_repeat: bool,
    candidates: Vec<PlacemarkCandidate>,
}

impl RepeatCallback for PlacemarkCollector<'_> {
    fn process_repeats(
        &mut self,
        traversal: &Traversal<'_>,
        repeat: &FormElement,
        instances: &[SubmissionSet],
        row: &mut Row,
    ) -> Result<(), TraversalError> {
        for instance in instances {
            let instance_row = traversal.render(instance, self)?;
            if repeat.id() != self.location_group {
                row.add_data_from_row(&instance_row);
                continue;
            }

            let mut assembled = row.clone_values();
            assembled.add_data_from_row(&instance_row);
            let name = if self.title_in_repeat {
                title(instance, self.anchors.title)
            } else {
                None
            };
            let image = if self.image_in_repeat {
                image_url(instance, self.anchors.image, self.links)
            } else {
                None
            };
            self.candidates.push(PlacemarkCandidate {
                location: geo_point(instance, self.anchors.location),
                title: name,
                image_url: image,
                row: assembled,
            });
        }
        Ok(())
    }
}

fn anchor_field<'f>(
    form: &'f FormDefinition,
    anchor: AnchorRole,
    id: ElementId,
) -> Result<&'f FormElement, KmlConfigError> {
    let element = form
        .get(id)
        .ok_or(KmlConfigError::UnknownAnchor { anchor })?;
    if !element.is_field() {
        return Err(KmlConfigError::AnchorIsGroup {
            anchor,
            path: form.path(id),
        });
    }
    Ok(element)
}

/// Check that `id` is top-level or shares the location's parent; returns
/// whether it lives in the location's repeat group.
fn co_located(
    form: &FormDefinition,
    anchor: AnchorRole,
    id: ElementId,
    location_group: ElementId,
) -> Result<bool, KmlConfigError> {
    let element = anchor_field(form, anchor, id)?;
    let parent = element.parent();
    if parent == Some(form.root()) {
        return Ok(false);
    }
    if parent == Some(location_group) {
        return Ok(true);
    }
    Err(KmlConfigError::NotCoLocated {
        anchor,
        path: form.path(id),
    })
}

fn geo_point(set: &SubmissionSet, location: ElementId) -> Option<GeoPoint> {
    set.element_value(location)
        .and_then(FieldValue::as_geo_point)
        .copied()
}

fn title(set: &SubmissionSet, title: ElementId) -> Option<String> {
    set.element_value(title).and_then(FieldValue::display_text)
}

fn image_url(set: &SubmissionSet, image: Option<ElementId>, links: &LinkBuilder) -> Option<String> {
    set.element_value(image?)
        .and_then(FieldValue::as_blob)
        .map(|key| links.binary_data_url(key))
}
