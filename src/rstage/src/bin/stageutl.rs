use std::fs::OpenOptions;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::warn;

use rstage::{
    parse_ranges, AttrCond, AttrValue, AttributeFilter, Aum, DirectoryEntry, HexDump, Object,
    ObjectFilter, ObjectID, Result, SegmentFactory, SegmentFilter, SegmentKind, SegmentSelector,
    StageFile, WalkEvent,
};

#[derive(Parser)]
#[command(name = "stageutl", version, about = "Prodigy Classic STAGE.DAT cache utility")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pretty-print every object with its decoded segments
    View(ViewArgs),
    /// One line per object, like a directory listing
    Dir(DirArgs),
    /// Write objects, segments, or attributes to files
    Extract(ExtractArgs),
    /// List the known segment types
    ListSegmentTypes,
    /// Render the allocation unit map
    ShowAum(ShowAumArgs),
    /// Generate a DOS batch file that views objects through the
    /// Reception System
    Batch(BatchArgs),
}

#[derive(Args)]
struct ObjectFilterArgs {
    /// Delimiter to use in object names ('none' disables)
    #[arg(long, value_name = "CHAR", default_value = ".")]
    obj_delim: String,

    /// Character to use for non-printable characters in object names
    /// ('none' disables)
    #[arg(long, value_name = "CHAR", default_value = "_")]
    obj_nonascii: String,

    /// Object name glob(s)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    obj_name: Vec<String>,

    /// Object type
    #[arg(long, value_name = "RANGE")]
    obj_type: Option<String>,

    /// Object location in set
    #[arg(long, value_name = "RANGE")]
    obj_loc: Option<String>,

    /// Object status
    #[arg(long, value_name = "RANGE")]
    obj_status: Option<String>,

    /// Object version
    #[arg(long, value_name = "RANGE")]
    obj_version: Option<String>,

    /// Object storage candidacy
    #[arg(long, value_name = "RANGE")]
    obj_store: Option<String>,

    /// Minimum size of object
    #[arg(long, value_name = "INT")]
    obj_min_size: Option<u32>,

    /// Maximum size of object
    #[arg(long, value_name = "INT")]
    obj_max_size: Option<u32>,
}

fn char_opt(text: &str) -> Option<char> {
    match text {
        "" | "none" | "false" => None,
        "true" => None, // caller substitutes its own default
        other => other.chars().next(),
    }
}

impl ObjectFilterArgs {
    fn delim(&self) -> Option<char> {
        if self.obj_delim == "true" {
            Some('.')
        } else {
            char_opt(&self.obj_delim)
        }
    }

    fn nonascii(&self) -> Option<char> {
        if self.obj_nonascii == "true" {
            Some('_')
        } else {
            char_opt(&self.obj_nonascii)
        }
    }

    fn build(&self) -> Result<ObjectFilter> {
        let mut filter = ObjectFilter::new();
        filter.delim = self.delim();
        filter.nonascii = self.nonascii();
        for pattern in &self.obj_name {
            filter.add_name_pattern(pattern)?;
        }
        if let Some(ranges) = &self.obj_type {
            filter.types = parse_ranges(ranges)?;
        }
        if let Some(ranges) = &self.obj_loc {
            filter.locations = parse_ranges(ranges)?;
        }
        if let Some(ranges) = &self.obj_status {
            filter.statuses = parse_ranges(ranges)?;
        }
        if let Some(ranges) = &self.obj_version {
            filter.versions = parse_ranges(ranges)?;
        }
        if let Some(ranges) = &self.obj_store {
            filter.stores = parse_ranges(ranges)?;
        }
        filter.min_size = self.obj_min_size;
        filter.max_size = self.obj_max_size;
        Ok(filter)
    }
}

#[derive(Args)]
struct SegmentFilterArgs {
    /// Segment type(s), by name or value
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    seg_type: Vec<String>,

    /// Minimum size of segment
    #[arg(long, value_name = "INT")]
    seg_min_size: Option<u32>,

    /// Maximum size of segment
    #[arg(long, value_name = "INT")]
    seg_max_size: Option<u32>,
}

impl SegmentFilterArgs {
    fn build(&self) -> Result<SegmentFilter> {
        let mut filter = SegmentFilter {
            min_size: self.seg_min_size,
            max_size: self.seg_max_size,
            ..SegmentFilter::default()
        };
        for text in &self.seg_type {
            filter.selectors.push(SegmentSelector::parse(text)?);
        }
        Ok(filter)
    }
}

#[derive(Args)]
struct ViewArgs {
    /// STAGE.DAT file to use
    stagefile: PathBuf,
}

#[derive(Args)]
struct DirArgs {
    #[command(flatten)]
    objects: ObjectFilterArgs,

    /// Suppress column header
    #[arg(long)]
    no_header: bool,

    /// Don't process imbedded objects
    #[arg(long)]
    skip_imbedded: bool,

    /// STAGE.DAT file to use
    stagefile: PathBuf,
}

#[derive(Args)]
struct ExtractArgs {
    #[command(flatten)]
    objects: ObjectFilterArgs,

    #[command(flatten)]
    segments: SegmentFilterArgs,

    /// Attribute key[=[value]] condition(s)
    #[arg(long = "attr", value_name = "STR")]
    attrs: Vec<String>,

    /// Line number range(s)
    #[arg(long, value_name = "RANGE")]
    line: Option<String>,

    /// Output directory
    #[arg(long, value_name = "DIR", required = true)]
    output_dir: PathBuf,

    /// Output file name format
    #[arg(long, value_name = "FORMAT")]
    name_format: Option<String>,

    /// Output objects
    #[arg(long)]
    object: bool,

    /// Output segments
    #[arg(long)]
    segment: bool,

    /// Output attributes
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    attribute: Vec<String>,

    /// Clobber existing output files
    #[arg(long)]
    force: bool,

    /// Suppress object/segment headers in output
    #[arg(long)]
    no_header: bool,

    /// Don't process imbedded objects
    #[arg(long)]
    skip_imbedded: bool,

    /// STAGE.DAT file to use
    stagefile: PathBuf,
}

#[derive(Args)]
struct ShowAumArgs {
    /// Show raw values
    #[arg(long)]
    no_symbols: bool,

    /// STAGE.DAT file to use
    stagefile: PathBuf,
}

#[derive(Args)]
struct BatchArgs {
    #[command(flatten)]
    objects: ObjectFilterArgs,

    /// Enable prompting between objects
    #[arg(long)]
    prompt: bool,

    /// Suppress most output
    #[arg(long)]
    quiet: bool,

    /// Suppress some help messages
    #[arg(long)]
    expert: bool,

    /// Wait for keypress before exiting RS
    #[arg(long)]
    no_nohang: bool,

    /// Add option to CONFIG.SM
    #[arg(long = "option", value_name = "KEY[:[VALUE]]")]
    options: Vec<String>,

    /// Directory/AUM pair to use
    #[arg(long, value_name = "IDX", value_parser = clap::value_parser!(u8).range(0..=1))]
    start_index: Option<u8>,

    /// STAGE.DAT file to use
    stagefile: PathBuf,

    /// Name of batch file to create
    #[arg(default_value = "VIEW.BAT")]
    batchfile: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::View(args) => view(args),
        Command::Dir(args) => dir(args),
        Command::Extract(args) => extract(args),
        Command::ListSegmentTypes => list_segment_types(),
        Command::ShowAum(args) => show_aum(args),
        Command::Batch(args) => batch(args),
    };
    if let Err(e) = outcome {
        eprintln!("stageutl: {e}");
        std::process::exit(1);
    }
}

fn list_segment_types() -> Result<()> {
    for kind in SegmentKind::all() {
        if let Some(st) = kind.type_value() {
            println!("{:35} {:<#8x}({})", kind.name(), st, st);
        }
    }
    println!("\n'{}' matches all others", SegmentKind::Unknown.name());
    Ok(())
}

fn show_aum(args: ShowAumArgs) -> Result<()> {
    // symbols
    const INVALID: &str = "X";
    const CONSECUTIVE: &str = "-";
    const EOL: &str = "%";
    const UNUSED: &str = "U";

    let stage = StageFile::open(&args.stagefile)?;
    // Allocation unit ids before the prologue aren't valid.
    let start_auid = stage.prologue().prologue_start_id as usize;
    let table = &stage.aum().table()[start_auid..];

    let mut out: Vec<String> = Vec::new();
    if args.no_symbols {
        out.resize(start_auid, format!("{:^4}", ""));
        out.extend(table.iter().map(|v| format!("{v:^4x}")));
    } else {
        out.resize(start_auid, format!("{INVALID:^4}"));
        for (i, &v) in table.iter().enumerate() {
            let auid = (i + start_auid) as u16;
            if v == auid + 1 {
                out.push(format!("{CONSECUTIVE:^4}"));
            } else if v == Aum::EOL_ENTRY_VALUE {
                out.push(format!("{EOL:^4}"));
            } else if v == Aum::FREE_ENTRY_VALUE {
                out.push(format!("{UNUSED:^4}"));
            } else {
                // object is fragmented
                out.push(format!("{v:^4x}"));
            }
        }
    }

    // present output as row address + 16 columns
    for (row, cells) in out.chunks(16).enumerate() {
        println!("{:#5x}:  {}", row * 16, cells.concat());
    }
    Ok(())
}

/// Renders `{field}` placeholders in an output-name template.
fn render_template(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

fn print_attr_block(pad: &str, name: &str, value: &AttrValue<'_>) {
    const SHORT_DUMP_LEN: usize = 8;
    match value {
        AttrValue::Bytes(bytes) if bytes.len() > SHORT_DUMP_LEN => {
            println!("{pad}{name:16}: ({} bytes)", bytes.len());
            for line in HexDump::new().lines(bytes) {
                println!("{pad}  {line}");
            }
        }
        AttrValue::Bytes(bytes) => {
            println!("{pad}{name:16}:   {}", HexDump::short().dump(bytes));
        }
        AttrValue::U8(v) => println!("{pad}{name:16}: {:<#8x}({})", v, v),
        AttrValue::U16(v) => println!("{pad}{name:16}: {:<#8x}({})", v, v),
        AttrValue::Id(id) => println!("{pad}{name:16}: {id}"),
    }
}

fn view(args: ViewArgs) -> Result<()> {
    let stage = StageFile::open(&args.stagefile)?;
    let factory = SegmentFactory::new();

    let mut line = 0usize;
    for i in 0..stage.dir().in_use as usize {
        let entry = stage.dir().entry(i)?.clone();
        let object = match stage.get_object(i) {
            Ok(object) => object,
            Err(e) => {
                warn!("skipping object #{i}: {e}");
                continue;
            }
        };

        if line > 0 {
            println!();
        }
        for event in factory.walk(&object, true) {
            match event {
                WalkEvent::Object { depth: 0, object } => {
                    line += 1;
                    println!(
                        "{:04} {} {} {:#x}   length={:#x}({}) status={:#x} startid={:#x}({})",
                        line,
                        object.id.render_name(Some('.'), Some('_')),
                        object.id.location,
                        object.id.object_type,
                        entry.length,
                        entry.length,
                        entry.status,
                        entry.start_id,
                        entry.start_id,
                    );
                    println!(
                        "{}-       version={:#x} store_candidacy={} check={:#x} setsize={}",
                        " ".repeat(5),
                        entry.version.version_value(),
                        entry.version.store_candidacy(),
                        entry.check,
                        object.set_size,
                    );
                }
                WalkEvent::Object { depth, object } => {
                    line += 1;
                    let pad = "|   ".repeat(depth);
                    println!(
                        "{:04} {}- {} {} {:#x}   length={:#x}({}) version={:#x}",
                        line,
                        pad,
                        object.id.render_name(Some('.'), Some('_')),
                        object.id.location,
                        object.id.object_type,
                        object.length,
                        object.length,
                        object.version.version_value(),
                    );
                    println!(
                        "{}{}-        store_candidacy={} setsize={}",
                        " ".repeat(5),
                        pad,
                        object.version.store_candidacy(),
                        object.set_size,
                    );
                }
                WalkEvent::Segment { depth, segment } => {
                    line += 1;
                    let pad = "|   ".repeat(depth + 1);
                    let st = segment
                        .seg_type()
                        .map_or("-".to_string(), |v| format!("{v:#x}"));
                    let sl = segment
                        .seg_length()
                        .map_or("-".to_string(), |v| format!("{v:#x}({v})"));
                    println!("{line:04} {pad}{}   st={} sl={}", segment.name(), st, sl);

                    let attr_pad = format!("{}{}", " ".repeat(5), "|   ".repeat(depth + 2));
                    for exception in segment.exceptions() {
                        println!("{attr_pad}{exception}");
                    }
                    if segment.kind() == SegmentKind::Unknown {
                        let data = segment.data(false);
                        if !data.is_empty() {
                            print_attr_block(&attr_pad, "data", &AttrValue::Bytes(data));
                        }
                    } else {
                        for (name, value) in segment.attributes() {
                            print_attr_block(&attr_pad, name, &value);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn dir(args: DirArgs) -> Result<()> {
    let stage = StageFile::open(&args.stagefile)?;
    let factory = SegmentFactory::new();
    let filter = args.objects.build()?;
    let delim = args.objects.delim();
    let nonascii = args.objects.nonascii();

    if !args.no_header {
        println!(
            "line      name     loc type   length   stat auid  ver stor check ssize"
        );
    }

    let mut line = 0usize;
    for i in 0..stage.dir().in_use as usize {
        let entry = stage.dir().entry(i)?.clone();
        let object = match stage.get_object(i) {
            Ok(object) => object,
            Err(e) => {
                warn!("skipping object #{i}: {e}");
                continue;
            }
        };
        for event in factory.walk(&object, !args.skip_imbedded) {
            line += 1;
            match event {
                WalkEvent::Object { depth: 0, object } => {
                    if !filter.matches_entry(&entry) {
                        continue;
                    }
                    println!(
                        "{:04}  {:12} {:2x}   {:2x} {:4x}({:5}) {:4x} {:4x}  {:3x}   {:2x}  {:04x}    {:2x}",
                        line,
                        object.id.render_name(delim, nonascii),
                        object.id.location,
                        object.id.object_type,
                        entry.length,
                        entry.length,
                        entry.status,
                        entry.start_id,
                        entry.version.version_value(),
                        entry.version.store_candidacy(),
                        entry.check,
                        object.set_size,
                    );
                }
                WalkEvent::Object { object, .. } => {
                    if !filter.matches_object(&object) {
                        continue;
                    }
                    println!(
                        "{:04}  {:12} {:2x}   {:2x} {:4x}({:5})            {:3x}   {:2x}          {:2x}",
                        line,
                        object.id.render_name(delim, nonascii),
                        object.id.location,
                        object.id.object_type,
                        object.length,
                        object.length,
                        object.version.version_value(),
                        object.version.store_candidacy(),
                        object.set_size,
                    );
                }
                WalkEvent::Segment { .. } => {}
            }
        }
    }
    Ok(())
}

struct OutputData<'a> {
    directory: &'a Path,
    template: String,
    force: bool,
}

impl OutputData<'_> {
    fn write(&self, vars: &[(&str, String)], data: &[u8]) -> Result<()> {
        let path = self.directory.join(render_template(&self.template, vars));
        let mut file = if self.force {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?
        } else {
            OpenOptions::new().write(true).create_new(true).open(&path)?
        };
        file.write_all(data)?;
        Ok(())
    }
}

fn extract(args: ExtractArgs) -> Result<()> {
    let stage = StageFile::open(&args.stagefile)?;
    let factory = SegmentFactory::new();
    let object_filter = args.objects.build()?;
    let segment_filter = args.segments.build()?;
    let attr_filter = AttributeFilter {
        conds: args.attrs.iter().map(|a| AttrCond::parse(a)).collect(),
    };
    let line_ranges: Option<Vec<RangeInclusive<u32>>> =
        args.line.as_deref().map(parse_ranges).transpose()?;
    let delim = args.objects.delim();
    let nonascii = args.objects.nonascii();

    let template = match &args.name_format {
        Some(fmt) => fmt.clone(),
        None if args.object => "{obj_name}_{id}".to_string(),
        None if args.segment => "{obj_name}_{id}_{segment_name}".to_string(),
        None => "{obj_name}_{id}_{segment_type}_{attribute}".to_string(),
    };
    let output = OutputData {
        directory: &args.output_dir,
        template,
        force: args.force,
    };

    // Object and segment lines share one numbering, so --line can select
    // either kind.
    let mut line = 0u32;
    for i in 0..stage.dir().in_use as usize {
        let entry = stage.dir().entry(i)?.clone();
        let top = match stage.get_object(i) {
            Ok(object) => object,
            Err(e) => {
                warn!("skipping object #{i}: {e}");
                continue;
            }
        };

        // Walk context per depth: (object, its real-or-synthesized
        // directory entry, the object's line number, already extracted).
        let mut stack: Vec<(Object, DirectoryEntry, u32, bool)> = Vec::new();
        for event in factory.walk(&top, !args.skip_imbedded) {
            match event {
                WalkEvent::Object { depth, object } => {
                    line += 1;
                    let entry = if depth == 0 {
                        entry.clone()
                    } else {
                        DirectoryEntry::from_object(&object)
                    };
                    stack.truncate(depth);
                    stack.push((object, entry, line, false));
                }
                WalkEvent::Segment { depth, segment } => {
                    line += 1;
                    let (object, entry, obj_line, extracted) = &mut stack[depth];
                    if *extracted {
                        continue;
                    }

                    if let Some(ranges) = &line_ranges {
                        let hit = ranges
                            .iter()
                            .any(|r| r.contains(obj_line) || r.contains(&line));
                        if !hit {
                            continue;
                        }
                    }
                    let object_ok = if depth == 0 {
                        object_filter.matches_entry(entry)
                    } else {
                        object_filter.matches_object(object)
                    };
                    if !object_ok
                        || !segment_filter.matches(&segment)
                        || !attr_filter.matches(&segment)
                    {
                        continue;
                    }

                    let id = if args.object { *obj_line } else { line };
                    let mut vars = vec![
                        ("obj_name", object.id.render_name(delim, nonascii)),
                        ("obj_name_nodelim", object.id.render_name(None, nonascii)),
                        ("obj_loc", object.id.location.to_string()),
                        ("obj_type", object.id.object_type.to_string()),
                        ("obj_status", entry.status.to_string()),
                        ("obj_version", object.version.version_value().to_string()),
                        ("obj_store", object.version.store_candidacy().to_string()),
                        (
                            "segment_type",
                            segment
                                .seg_type()
                                .map_or("none".to_string(), |v| v.to_string()),
                        ),
                        ("segment_name", segment.name().to_string()),
                        (
                            "segment_len",
                            segment
                                .seg_length()
                                .map_or("none".to_string(), |v| v.to_string()),
                        ),
                        ("attribute", String::new()),
                        ("id", id.to_string()),
                    ];

                    if args.object {
                        *extracted = true;
                        output.write(&vars, object.data(!args.no_header))?;
                    } else if args.segment {
                        output.write(&vars, segment.data(!args.no_header))?;
                    } else if !args.attribute.is_empty() {
                        let all = args.attribute.iter().any(|a| a == "*");
                        for (name, value) in segment.attributes() {
                            if !all && !args.attribute.iter().any(|a| a == name) {
                                continue;
                            }
                            vars.retain(|(n, _)| *n != "attribute");
                            vars.push(("attribute", name.to_string()));
                            output.write(&vars, &value.to_bytes())?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Emits the DOS batch file and CONFIG fragments that drive the
/// Reception System over the selected objects. DOS wants CRLF endings.
struct Batcher {
    lines: Vec<String>,
    prompt: bool,
    expert: bool,
    quiet: bool,
    count: usize,
    batchfile: String,
}

impl Batcher {
    fn new(batchfile: String, prompt: bool, expert: bool, quiet: bool) -> Batcher {
        Batcher {
            lines: Vec::new(),
            prompt,
            expert,
            quiet,
            count: 0,
            batchfile,
        }
    }

    fn batch(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn write_config(&mut self, config: &[(String, Option<String>)]) {
        self.batch("REM  Build base configuration file");
        // An empty file that works in all DOSes is tricky, so start with
        // a harmless comment line. The RS tolerates unknown keys.
        self.batch(&format!(
            "ECHO ; config file for use with {} > CONFIG.$$$",
            self.batchfile
        ));
        for (key, value) in config {
            match value {
                Some(value) => self.batch(&format!("ECHO {key}:{value} >> CONFIG.$$$")),
                None => self.batch(&format!("ECHO {key} >> CONFIG.$$$")),
            }
        }
        self.batch("");
    }

    fn write_header(&mut self, argv: &str, config: &[(String, Option<String>)]) {
        self.batch("@ECHO OFF");
        self.batch("");
        self.batch("REM  This file was automatically generated with: ");
        self.batch(&format!("REM    {argv}"));
        self.batch("");
        self.batch("REM  Make a feeble attempt to keep people from overwriting");
        self.batch("REM  their legitimate CONFIG.SM file.");
        self.batch("RENAME CONFIG.SM CONFIG.BCK > NUL");
        self.batch("");
        self.batch("REM  Just in case you forgot to check it first ...");
        self.batch("COPY OBJECTS.LOG OBJECTS.OLD > NUL");
        self.batch("ECHO Objects shown: > OBJECTS.LOG");
        self.batch("");
        self.write_config(config);
        self.batch("CLS");

        if self.prompt && !(self.expert || self.quiet) {
            self.batch("ECHO Pressing Y at the Continue prompt will load the object.");
            self.batch("ECHO Pressing N at the Continue prompt will exit.");
            self.batch("ECHO Pressing S at the Continue prompt will skip to the next object.");
            self.batch("ECHO.");
            self.batch("");
        }

        // This allows jumping to a specific object.
        self.batch("IF NOT \"%1\"==\"\" GOTO OBJ%1");
        self.batch("");

        if !(self.expert || self.quiet) {
            self.batch("ECHO If it hangs, OBJECTS.LOG contains a list of objects viewed. Specify a ");
            self.batch("ECHO number on the command line to jump to that object or one beyond it.");
            self.batch("ECHO.");
            if !self.prompt {
                self.batch("PAUSE");
            }
            self.batch("");
        }
    }

    fn add_object(&mut self, id: &ObjectID) {
        let mut name = id.render_name(Some('.'), None);
        let full_name = id.render_id(Some('.'), None);

        if name.len() < 12 {
            name.push('1');
        }

        self.count += 1;
        let count = self.count;

        self.batch(&format!(":OBJ{count}"));
        if !self.quiet {
            self.batch(&format!("ECHO {count:4} - {full_name}"));
        }
        if self.prompt {
            self.batch("CHOICE /C:YNS Continue");
            self.batch("ECHO.");
            self.batch(&format!("IF ERRORLEVEL == 3 GOTO SKIP{count}"));
            self.batch("IF ERRORLEVEL == 2 GOTO END");
        }
        self.batch("COPY CONFIG.$$$ CONFIG.SM > NUL");
        self.batch(&format!("ECHO object:{name} >> CONFIG.SM"));
        self.batch(&format!("ECHO {count:4} - {full_name} >> OBJECTS.LOG"));
        // Start the Reception System.
        self.batch("RS");
        if !self.quiet {
            self.batch(&format!("ECHO ** That was {count} - {full_name}"));
        }
        if self.prompt {
            self.batch(&format!(":SKIP{count}"));
        }
        if !self.quiet {
            self.batch("ECHO.");
        }
        self.batch("");
    }

    fn write_trailer(&mut self) {
        self.batch("");
        self.batch(":END");
        self.batch("DEL CONFIG.$$$ > NUL");
        self.batch("DEL CONFIG.SM > NUL");
        self.batch("RENAME CONFIG.BCK CONFIG.SM > NUL");
        if !self.quiet {
            self.batch("ECHO DONE");
        }
        self.batch("");
    }

    fn finish(self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        for line in &self.lines {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\r\n")?;
        }
        Ok(())
    }
}

fn batch(args: BatchArgs) -> Result<()> {
    let mut stage = StageFile::open(&args.stagefile)?;
    stage.change_index(args.start_index.map(|i| i as usize))?;
    let filter = args.objects.build()?;

    let mut config: Vec<(String, Option<String>)> = Vec::new();
    if !args.no_nohang {
        config.push(("nohang".to_string(), None));
    }
    for option in &args.options {
        match option.split_once(':') {
            Some((key, value)) => config.push((key.to_string(), Some(value.to_string()))),
            None => config.push((option.clone(), None)),
        }
    }

    let argv: Vec<String> = std::env::args().collect();
    let mut batcher = Batcher::new(
        args.batchfile.display().to_string(),
        args.prompt,
        args.expert,
        args.quiet,
    );
    batcher.write_header(&argv.join(" "), &config);
    for i in 0..stage.dir().in_use as usize {
        let entry = stage.dir().entry(i)?;
        if !filter.matches_entry(entry) {
            continue;
        }
        batcher.add_object(&entry.id);
    }
    batcher.write_trailer();
    batcher.finish(&args.batchfile)?;
    Ok(())
}
