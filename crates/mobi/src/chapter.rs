//! The navigable structure of a book: top-level chapters, each optionally
//! holding one level of sub-chapters.

/// Byte range of a rendered chapter inside the book text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub offset: u32,
    pub len: u32,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    id: usize,
    title: String,
    html: String,
    placement: Placement,
    sub_chapters: Vec<SubChapter>,
}

/// A leaf entry below a [`Chapter`]. Sub-chapters cannot nest further.
#[derive(Debug, Clone)]
pub struct SubChapter {
    parent: usize,
    title: String,
    html: String,
    placement: Placement,
}

impl Chapter {
    pub(crate) fn new(id: usize, title: impl Into<String>, html: impl Into<String>) -> Self {
        Chapter {
            id,
            title: title.into(),
            html: html.into(),
            placement: Placement::default(),
            sub_chapters: Vec::new(),
        }
    }

    /// Position of the chapter among the top-level chapters of its book.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn sub_chapters(&self) -> &[SubChapter] {
        &self.sub_chapters
    }

    pub fn add_sub_chapter(&mut self, title: impl Into<String>, html: impl Into<String>) -> &mut Self {
        self.sub_chapters.push(SubChapter {
            parent: self.id,
            title: title.into(),
            html: html.into(),
            placement: Placement::default(),
        });
        self
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub(crate) fn sub_chapters_mut(&mut self) -> &mut [SubChapter] {
        &mut self.sub_chapters
    }
}

impl SubChapter {
    /// Id of the owning [`Chapter`].
    pub fn parent(&self) -> usize {
        self.parent
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }
}

/// Renders the book text and records where each chapter landed in it.
pub(crate) fn render(chapters: &mut [Chapter], stylesheet: Option<&str>) -> String {
    let mut html = String::from("<html><head>");
    if let Some(css) = stylesheet {
        html.push_str("<style>");
        html.push_str(css);
        html.push_str("</style>");
    }
    html.push_str("</head><body>");

    for chapter in chapters.iter_mut() {
        let placement = render_section(&mut html, &chapter.title, &chapter.html);
        chapter.set_placement(placement);
        for sub in chapter.sub_chapters_mut() {
            let placement = render_section(&mut html, &sub.title, &sub.html);
            sub.set_placement(placement);
        }
    }

    html.push_str("</body></html>");
    html
}

fn render_section(out: &mut String, title: &str, body: &str) -> Placement {
    let offset = out.len();
    out.push_str("<h1>");
    out.push_str(title);
    out.push_str("</h1>");
    out.push_str(body);
    out.push_str("<mbp:pagebreak/>");
    Placement {
        offset: offset as u32,
        len: (out.len() - offset) as u32,
    }
}
