//! Content stream interpretation into positioned glyphs and ruling edges.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::font::{number, Font};
use super::geometry::{BBox, Edge};
use super::page::Glyph;

/// Form XObjects nested deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 8;

/// Segments straighter than this (in points) count as axis-aligned.
const AXIS_TOLERANCE: f64 = 0.5;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(x: f64, y: f64) -> Self {
        Matrix {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let v: Vec<f64> = operands.iter().filter_map(number).collect();
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Rc<Font>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Output of interpreting one page.
#[derive(Debug, Default)]
pub struct PageContent {
    pub glyphs: Vec<Glyph>,
    pub edges: Vec<Edge>,
}

/// Walks content streams of a page, tracking text and graphics state.
pub struct Interpreter<'a> {
    doc: &'a Document,
    page_height: f64,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<((f64, f64), (f64, f64))>,
    current: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
    fonts: HashMap<ObjectId, Rc<Font>>,
    out: PageContent,
}

impl<'a> Interpreter<'a> {
    /// `origin` is the lower-left corner of the media box.
    pub fn new(doc: &'a Document, page_height: f64, origin: (f64, f64)) -> Self {
        Self {
            doc,
            page_height,
            state: GraphicsState {
                ctm: Matrix::translate(-origin.0, -origin.1),
                text: TextState::default(),
            },
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            current: None,
            subpath_start: None,
            fonts: HashMap::new(),
            out: PageContent::default(),
        }
    }

    /// Interpret a content stream with the given resources.
    pub fn run(mut self, content: &[u8], resources: &Dictionary) -> Result<PageContent, String> {
        self.interpret(content, resources, 0)?;
        debug!("Interpreted {} glyphs, {} edges", self.out.glyphs.len(), self.out.edges.len());
        Ok(self.out)
    }

    fn interpret(&mut self, content: &[u8], resources: &Dictionary, depth: usize) -> Result<(), String> {
        let content = Content::decode(content).map_err(|e| e.to_string())?;
        for op in &content.operations {
            self.execute(&op.operator, &op.operands, resources, depth);
        }
        Ok(())
    }

    fn execute(&mut self, operator: &str, operands: &[Object], resources: &Dictionary, depth: usize) {
        let num = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);
        match operator {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }

            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                let font_name = operands.first().and_then(|o| o.as_name().ok());
                let font = font_name.and_then(|n| self.font(resources, n));
                self.state.text.font = font;
                self.state.text.size = num(1);
            }
            "Tc" => self.state.text.char_spacing = num(0),
            "Tw" => self.state.text.word_spacing = num(0),
            "Tz" => self.state.text.scale = num(0) / 100.0,
            "TL" => self.state.text.leading = num(0),
            "Ts" => self.state.text.rise = num(0),
            "Td" => self.move_line(num(0), num(1)),
            "TD" => {
                self.state.text.leading = -num(1);
                self.move_line(num(0), num(1));
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.state.text.word_spacing = num(0);
                self.state.text.char_spacing = num(1);
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(n) = number(other) {
                                    let text = &self.state.text;
                                    let tx = -n / 1000.0 * text.size * text.scale;
                                    self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
                                }
                            }
                        }
                    }
                }
            }

            "m" => {
                let p = self.state.ctm.apply(num(0), num(1));
                self.current = Some(p);
                self.subpath_start = Some(p);
            }
            "l" => {
                let p = self.state.ctm.apply(num(0), num(1));
                if let Some(from) = self.current {
                    self.path.push((from, p));
                }
                self.current = Some(p);
            }
            "c" => self.current = Some(self.state.ctm.apply(num(4), num(5))),
            "v" | "y" => self.current = Some(self.state.ctm.apply(num(2), num(3))),
            "re" => {
                let (x, y, w, h) = (num(0), num(1), num(2), num(3));
                let ctm = self.state.ctm;
                let corners = [
                    ctm.apply(x, y),
                    ctm.apply(x + w, y),
                    ctm.apply(x + w, y + h),
                    ctm.apply(x, y + h),
                ];
                for i in 0..4 {
                    self.path.push((corners[i], corners[(i + 1) % 4]));
                }
                self.current = Some(corners[0]);
                self.subpath_start = Some(corners[0]);
            }
            "h" => self.close_subpath(),
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.paint();
            }
            "n" => self.clear_path(),

            "Do" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.draw_form(resources, name, depth);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let Some(font) = self.state.text.font.clone() else {
            trace!("Text shown without a font, skipped");
            return;
        };
        let text = self.state.text.clone();

        for decoded in font.decode(bytes) {
            let params = Matrix {
                a: text.size * text.scale,
                b: 0.0,
                c: 0.0,
                d: text.size,
                e: 0.0,
                f: text.rise,
            };
            let render = params.multiply(&self.text_matrix).multiply(&self.state.ctm);
            let (x, y) = render.apply(0.0, 0.0);
            let size = render.c.hypot(render.d);
            let horizontal = render.a.hypot(render.b);
            let width = decoded.width * horizontal;

            if !decoded.text.is_empty() {
                let bbox = BBox::new(
                    x,
                    self.page_height - (y + 0.8 * size),
                    x + width,
                    self.page_height - (y - 0.2 * size),
                );
                self.out.glyphs.push(Glyph::new(decoded.text.clone(), bbox, size));
            }

            let spacing = text.char_spacing + if decoded.is_space { text.word_spacing } else { 0.0 };
            let tx = (decoded.width * text.size + spacing) * text.scale;
            self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
        }
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.path.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn paint(&mut self) {
        for ((x0, y0), (x1, y1)) in self.path.drain(..) {
            let top0 = self.page_height - y0;
            let top1 = self.page_height - y1;
            if (y1 - y0).abs() <= AXIS_TOLERANCE && (x1 - x0).abs() > AXIS_TOLERANCE {
                self.out.edges.push(Edge::horizontal(x0, x1, (top0 + top1) / 2.0));
            } else if (x1 - x0).abs() <= AXIS_TOLERANCE && (y1 - y0).abs() > AXIS_TOLERANCE {
                self.out.edges.push(Edge::vertical((x0 + x1) / 2.0, top0, top1));
            }
        }
        self.clear_path();
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.current = None;
        self.subpath_start = None;
    }

    fn font(&mut self, resources: &Dictionary, name: &[u8]) -> Option<Rc<Font>> {
        let fonts = resolve_dict(self.doc, resources.get(b"Font").ok())?;
        let entry = fonts.get(name).ok()?;
        if let Object::Reference(id) = entry {
            if let Some(font) = self.fonts.get(id) {
                return Some(Rc::clone(font));
            }
        }
        let dict = resolve_dict(self.doc, Some(entry))?;
        let font = Rc::new(Font::load(self.doc, dict));
        if let Object::Reference(id) = entry {
            self.fonts.insert(*id, Rc::clone(&font));
        }
        Some(font)
    }

    fn draw_form(&mut self, resources: &Dictionary, name: &[u8], depth: usize) {
        if depth >= MAX_FORM_DEPTH {
            debug!("Form XObject nesting too deep, skipped");
            return;
        }
        let doc = self.doc;
        let Some(xobjects) = resolve_dict(doc, resources.get(b"XObject").ok()) else {
            return;
        };
        let Some(Ok((_, Object::Stream(stream)))) = xobjects.get(name).ok().map(|o| doc.dereference(o)) else {
            return;
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Form");
        if !is_form {
            return;
        }

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };
        let form_resources = resolve_dict(doc, stream.dict.get(b"Resources").ok())
            .cloned()
            .unwrap_or_else(|| resources.clone());
        let form_matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|a| Matrix::from_operands(a))
            .unwrap_or(Matrix::IDENTITY);

        self.stack.push(self.state.clone());
        self.state.ctm = form_matrix.multiply(&self.state.ctm);
        if let Err(e) = self.interpret(&data, &form_resources, depth + 1) {
            debug!("Failed to interpret form XObject: {}", e);
        }
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

}

fn resolve_dict<'d>(doc: &'d Document, object: Option<&'d Object>) -> Option<&'d Dictionary> {
    let (_, object) = doc.dereference(object?).ok()?;
    object.as_dict().ok()
}
