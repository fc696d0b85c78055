use std::collections::HashMap;

use sle_engine::IVec2;
use tracing::{debug, warn};

use super::session::{EditorSession, PlaceOutcome, ScrollDirection, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EditCommand {
    Assets,
    Place {
        asset: String,
        at: IVec2,
    },
    PlaceArea {
        asset: String,
        from: IVec2,
        to: IVec2,
    },
    Label {
        asset: String,
        at: IVec2,
        text: String,
    },
    Erase {
        at: IVec2,
    },
    Pick {
        at: IVec2,
    },
    Scroll {
        delta: IVec2,
    },
    Move {
        direction: ScrollDirection,
        steps: u32,
    },
    Home,
    Visible,
    Stats,
    Dump,
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LocalAction {
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Edit(EditCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type ParseFn = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;

struct CommandSpec {
    name: &'static str,
    help: &'static str,
    arg_schema: &'static str,
    parse: ParseFn,
}

const BUILTINS: &[(&str, &str, &str, ParseFn)] = &[
    ("help", "List commands", "", parse_help_command),
    ("assets", "List known assets", "", parse_assets_command),
    (
        "place",
        "Place an asset on the unit cell under a screen point",
        "<asset> <x:i32> <y:i32>",
        parse_place_command,
    ),
    (
        "place_area",
        "Fill the cells between two screen points with a seamless asset",
        "<asset> <x0:i32> <y0:i32> <x1:i32> <y1:i32>",
        parse_place_area_command,
    ),
    (
        "label",
        "Place a label asset with text",
        "<asset> <x:i32> <y:i32> <text...>",
        parse_label_command,
    ),
    (
        "erase",
        "Erase every visible object under a screen point",
        "<x:i32> <y:i32>",
        parse_erase_command,
    ),
    (
        "pick",
        "Show the topmost object under a screen point",
        "<x:i32> <y:i32>",
        parse_pick_command,
    ),
    (
        "scroll",
        "Scroll level content by a pixel delta",
        "<dx:i32> <dy:i32>",
        parse_scroll_command,
    ),
    (
        "move",
        "Move the view by scroll steps",
        "<up|down|left|right> [steps:u32]",
        parse_move_command,
    ),
    ("home", "Reset scrolling", "", parse_home_command),
    ("visible", "List visible objects", "", parse_visible_command),
    ("stats", "Show residency counters", "", parse_stats_command),
    ("dump", "Print the level as json", "", parse_dump_command),
    ("save", "Write the level file", "", parse_save_command),
    ("quit", "Quit editor", "", parse_quit_command),
];

pub(crate) struct CommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl CommandRegistry {
    fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_editor_builtins() -> Self {
        let mut registry = Self::new();
        for (name, help, arg_schema, parse) in BUILTINS {
            if let Err(error) = registry.register(*name, *help, *arg_schema, *parse) {
                warn!(command = *name, error = %error, "command_registration_failed");
            }
        }
        registry
    }

    fn register(
        &mut self,
        name: &'static str,
        help: &'static str,
        arg_schema: &'static str,
        parse: ParseFn,
    ) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help,
            arg_schema,
            parse,
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    fn iter_specs_in_order(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }
}

/// Turns shell lines into edits against a session, collecting output lines.
pub(crate) struct CommandProcessor {
    registry: CommandRegistry,
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandProcessor {
    pub(crate) fn new() -> Self {
        Self {
            registry: CommandRegistry::with_editor_builtins(),
        }
    }

    pub(crate) fn process_line(
        &self,
        session: &mut EditorSession,
        raw_line: &str,
        out: &mut Vec<String>,
    ) -> LineOutcome {
        match self.parse_line(raw_line) {
            Ok(None) => LineOutcome::Continue,
            Ok(Some(ParsedCommand::Local(LocalAction::Help))) => {
                self.write_help(out);
                LineOutcome::Continue
            }
            Ok(Some(ParsedCommand::Local(LocalAction::Quit))) => LineOutcome::Quit,
            Ok(Some(ParsedCommand::Edit(command))) => {
                debug!(command = ?command, "edit_command");
                apply_edit(session, command, out);
                LineOutcome::Continue
            }
            Err(line) => {
                out.push(line);
                LineOutcome::Continue
            }
        }
    }

    /// `Ok(None)` for blank lines; `Err` holds the line to print.
    fn parse_line(&self, raw_line: &str) -> Result<Option<ParsedCommand>, String> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let tokens =
            tokenize_line(trimmed).map_err(|reason| format!("error: {reason}. usage: help"))?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let Some(spec) = self.registry.lookup(command_name) else {
            return Err(format!(
                "error: unknown command '{}'. try: help",
                command_name
            ));
        };

        (spec.parse)(args)
            .map(Some)
            .map_err(|error| format!("error: {}. usage: {}", error.reason, error.usage))
    }

    fn write_help(&self, out: &mut Vec<String>) {
        for spec in self.registry.iter_specs_in_order() {
            let line = if spec.arg_schema.is_empty() {
                format!("{} - {}", spec.name, spec.help)
            } else {
                format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
            };
            out.push(line);
        }
    }
}

fn apply_edit(session: &mut EditorSession, command: EditCommand, out: &mut Vec<String>) {
    match command {
        EditCommand::Assets => {
            let names: Vec<String> = session.asset_names().map(ToString::to_string).collect();
            if names.is_empty() {
                out.push("no assets found".to_string());
            }
            for name in names {
                if let Some(asset) = session.asset(&name) {
                    out.push(format!(
                        "{} layer={} anchor={} seamless={} size={}x{}",
                        asset.name,
                        asset.layer.name(),
                        asset.anchor.name(),
                        asset.seamless,
                        asset.size.w,
                        asset.size.h
                    ));
                }
            }
        }
        EditCommand::Place { asset, at } => {
            let result = session.place(&asset, at);
            push_place_result(out, &asset, result);
        }
        EditCommand::PlaceArea { asset, from, to } => {
            let result = session.place_area(&asset, from, to);
            push_place_result(out, &asset, result);
        }
        EditCommand::Label { asset, at, text } => {
            let result = session.label(&asset, at, text);
            push_place_result(out, &asset, result);
        }
        EditCommand::Erase { at } => match session.erase(at) {
            Ok(erased) => out.push(format!("erased {} object(s)", erased.len())),
            Err(error) => out.push(format!("error: {error}")),
        },
        EditCommand::Pick { at } => match session.pick(at) {
            Some(row) => out.push(format!(
                "{} #{} layer={} screen={},{}",
                row.kind,
                row.id,
                row.layer.name(),
                row.screen[0],
                row.screen[1]
            )),
            None => out.push("nothing here".to_string()),
        },
        EditCommand::Scroll { delta } => {
            let result = session.scroll(delta);
            push_scroll(out, session, result);
        }
        EditCommand::Move { direction, steps } => {
            let result = session.move_view(direction, steps);
            push_scroll(out, session, result);
        }
        EditCommand::Home => {
            let result = session.home();
            push_scroll(out, session, result);
        }
        EditCommand::Visible => {
            let rows = session.visible_rows();
            for row in &rows {
                match serde_json::to_string(row) {
                    Ok(line) => out.push(line),
                    Err(error) => out.push(format!("error: {error}")),
                }
            }
            out.push(format!("visible: {}", rows.len()));
        }
        EditCommand::Stats => match serde_json::to_string(&session.stats()) {
            Ok(line) => out.push(line),
            Err(error) => out.push(format!("error: {error}")),
        },
        EditCommand::Dump => match session.level_json() {
            Ok(json) => out.extend(json.lines().map(ToString::to_string)),
            Err(error) => out.push(format!("error: {error}")),
        },
        EditCommand::Save => match session.save() {
            Ok(path) => out.push(format!("saved {}", path.display())),
            Err(error) => out.push(format!("error: {error}")),
        },
    }
}

fn push_place_result(
    out: &mut Vec<String>,
    asset: &str,
    result: Result<PlaceOutcome, SessionError>,
) {
    let line = match result {
        Ok(PlaceOutcome::Placed { id, position }) => {
            format!("placed {asset} #{} at {},{}", id.0, position.x, position.y)
        }
        Ok(PlaceOutcome::AlreadyPresent { position }) => {
            format!("already present: {asset} at {},{}", position.x, position.y)
        }
        Err(error) => format!("error: {error}"),
    };
    out.push(line);
}

fn push_scroll(
    out: &mut Vec<String>,
    session: &EditorSession,
    result: Result<(), SessionError>,
) {
    if let Err(error) = result {
        out.push(format!("error: {error}"));
    }
    let scroll = session.scroll_offset();
    out.push(format!("scroll {},{}", scroll.x, scroll.y));
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Local(LocalAction::Quit))
}

fn parse_assets_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "assets")?;
    Ok(ParsedCommand::Edit(EditCommand::Assets))
}

fn parse_place_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "place <asset> <x> <y>";
    let [asset, x, y] = args else {
        return Err(CommandParseError::new("expected <asset> <x> <y>", USAGE));
    };
    Ok(ParsedCommand::Edit(EditCommand::Place {
        asset: asset.clone(),
        at: parse_point(x, y, USAGE)?,
    }))
}

fn parse_place_area_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "place_area <asset> <x0> <y0> <x1> <y1>";
    let [asset, x0, y0, x1, y1] = args else {
        return Err(CommandParseError::new(
            "expected <asset> and two corner points",
            USAGE,
        ));
    };
    Ok(ParsedCommand::Edit(EditCommand::PlaceArea {
        asset: asset.clone(),
        from: parse_point(x0, y0, USAGE)?,
        to: parse_point(x1, y1, USAGE)?,
    }))
}

fn parse_label_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "label <asset> <x> <y> <text...>";
    let [asset, x, y, text @ ..] = args else {
        return Err(CommandParseError::new(
            "expected <asset> <x> <y> <text...>",
            USAGE,
        ));
    };
    if text.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            USAGE,
        ));
    }
    Ok(ParsedCommand::Edit(EditCommand::Label {
        asset: asset.clone(),
        at: parse_point(x, y, USAGE)?,
        text: text.join(" "),
    }))
}

fn parse_erase_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let at = parse_point_args(args, "erase <x> <y>")?;
    Ok(ParsedCommand::Edit(EditCommand::Erase { at }))
}

fn parse_pick_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let at = parse_point_args(args, "pick <x> <y>")?;
    Ok(ParsedCommand::Edit(EditCommand::Pick { at }))
}

fn parse_scroll_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let delta = parse_point_args(args, "scroll <dx> <dy>")?;
    Ok(ParsedCommand::Edit(EditCommand::Scroll { delta }))
}

fn parse_move_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "move <up|down|left|right> [steps]";
    let (direction, steps) = match args {
        [direction] => (direction, None),
        [direction, steps] => (direction, Some(steps)),
        _ => {
            return Err(CommandParseError::new(
                "expected a direction and optional step count",
                USAGE,
            ))
        }
    };
    let direction = ScrollDirection::from_name(direction).ok_or_else(|| {
        CommandParseError::new(
            format!("unknown direction '{direction}' (expected up|down|left|right)"),
            USAGE,
        )
    })?;
    let steps = match steps {
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            CommandParseError::new(format!("invalid step count '{raw}' (expected u32)"), USAGE)
        })?,
        None => 1,
    };
    Ok(ParsedCommand::Edit(EditCommand::Move { direction, steps }))
}

fn parse_home_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "home")?;
    Ok(ParsedCommand::Edit(EditCommand::Home))
}

fn parse_visible_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "visible")?;
    Ok(ParsedCommand::Edit(EditCommand::Visible))
}

fn parse_stats_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "stats")?;
    Ok(ParsedCommand::Edit(EditCommand::Stats))
}

fn parse_dump_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "dump")?;
    Ok(ParsedCommand::Edit(EditCommand::Dump))
}

fn parse_save_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "save")?;
    Ok(ParsedCommand::Edit(EditCommand::Save))
}

fn parse_point_args(args: &[String], usage: &str) -> Result<IVec2, CommandParseError> {
    let [x, y] = args else {
        return Err(CommandParseError::new("expected exactly two integers", usage));
    };
    parse_point(x, y, usage)
}

fn parse_point(x: &str, y: &str, usage: &str) -> Result<IVec2, CommandParseError> {
    let x = x.parse::<i32>().map_err(|_| {
        CommandParseError::new(format!("invalid x coordinate '{x}' (expected i32)"), usage)
    })?;
    let y = y.parse::<i32>().map_err(|_| {
        CommandParseError::new(format!("invalid y coordinate '{y}' (expected i32)"), usage)
    })?;
    Ok(IVec2::new(x, y))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::RgbaImage;
    use sle_engine::AssetCatalog;
    use tempfile::TempDir;

    use super::*;
    use crate::app::bootstrap::EditorConfig;

    fn session_in(temp: &TempDir) -> EditorSession {
        let assets = temp.path().join("assets");
        let dir = assets.join("colorkey");
        fs::create_dir_all(&dir).expect("mkdir");
        RgbaImage::new(16, 16)
            .save(dir.join("brick.blocks.False.topleft.png"))
            .expect("write png");
        let catalog = AssetCatalog::discover(&assets).expect("catalog");
        EditorSession::open(
            EditorConfig::default(),
            catalog,
            temp.path().join("levels").join("level.lvl"),
        )
        .expect("open")
    }

    fn run(processor: &CommandProcessor, session: &mut EditorSession, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        processor.process_line(session, line, &mut out);
        out
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let processor = CommandProcessor::new();
        let mut out = Vec::new();
        processor.write_help(&mut out);

        assert_eq!(out.len(), BUILTINS.len());
        assert_eq!(out[0], "help - List commands");
        assert_eq!(
            out[2],
            "place <asset> <x:i32> <y:i32> - Place an asset on the unit cell under a screen point"
        );
        assert_eq!(out[out.len() - 1], "quit - Quit editor");
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        let processor = CommandProcessor::new();
        assert_eq!(
            processor.parse_line("nope"),
            Err("error: unknown command 'nope'. try: help".to_string())
        );
    }

    #[test]
    fn bad_args_report_usage_hint() {
        let processor = CommandProcessor::new();
        assert_eq!(
            processor.parse_line("erase foo 3"),
            Err("error: invalid x coordinate 'foo' (expected i32). usage: erase <x> <y>"
                .to_string())
        );
        assert_eq!(
            processor.parse_line("move sideways"),
            Err("error: unknown direction 'sideways' (expected up|down|left|right). \
usage: move <up|down|left|right> [steps]"
                .to_string())
        );
        assert_eq!(
            processor.parse_line("home now"),
            Err("error: unexpected extra arguments. usage: home".to_string())
        );
    }

    #[test]
    fn commands_parse_case_insensitively_with_quotes() {
        let processor = CommandProcessor::new();
        assert_eq!(
            processor.parse_line("LABEL sign 10 -4 \"hello  world\" again"),
            Ok(Some(ParsedCommand::Edit(EditCommand::Label {
                asset: "sign".to_string(),
                at: IVec2::new(10, -4),
                text: "hello  world again".to_string(),
            })))
        );
        assert_eq!(
            processor.parse_line("Move left 3"),
            Ok(Some(ParsedCommand::Edit(EditCommand::Move {
                direction: ScrollDirection::Left,
                steps: 3,
            })))
        );
        assert_eq!(processor.parse_line("   "), Ok(None));
    }

    #[test]
    fn out_of_range_scrolls_report_errors_and_keep_position() {
        let temp = TempDir::new().expect("tempdir");
        let mut session = session_in(&temp);
        let processor = CommandProcessor::new();

        assert_eq!(
            run(&processor, &mut session, "scroll 8 -4"),
            vec!["scroll 8,-4"]
        );
        let out = run(&processor, &mut session, "scroll 2147483647 0");
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("error: scroll from 8,-4"), "{out:?}");
        assert_eq!(out[1], "scroll 8,-4");
        assert_eq!(
            run(&processor, &mut session, "move left 4294967295"),
            vec!["error: step count 4294967295 is too large", "scroll 8,-4"]
        );
        assert_eq!(
            run(&processor, &mut session, "place brick 400 10"),
            vec!["error: point 400,10 is off screen"]
        );
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("label \"big sign\" 1 2 \"\"").expect("tokens"),
            vec!["label", "big sign", "1", "2", ""]
        );
        assert!(tokenize_line("label \"oops").is_err());
    }

    #[test]
    fn shell_session_places_scrolls_and_saves() {
        let temp = TempDir::new().expect("tempdir");
        let mut session = session_in(&temp);
        let processor = CommandProcessor::new();

        assert_eq!(
            run(&processor, &mut session, "place brick 20 20"),
            vec!["placed brick #0 at 16,16"]
        );
        assert_eq!(
            run(&processor, &mut session, "place brick 17 30"),
            vec!["already present: brick at 16,16"]
        );
        assert_eq!(
            run(&processor, &mut session, "move right 2"),
            vec!["scroll -8,0"]
        );
        assert_eq!(
            run(&processor, &mut session, "pick 9 17"),
            vec!["brick #0 layer=blocks screen=8,16"]
        );
        assert_eq!(run(&processor, &mut session, "home"), vec!["scroll 0,0"]);
        assert_eq!(
            run(&processor, &mut session, "visible").last().map(String::as_str),
            Some("visible: 1")
        );
        assert_eq!(
            run(&processor, &mut session, "place lava 0 0"),
            vec!["error: unknown asset 'lava'. try: assets"]
        );

        let saved = run(&processor, &mut session, "save");
        assert!(saved[0].starts_with("saved "), "{saved:?}");
        assert!(temp.path().join("levels").join("level.lvl").is_file());
        assert_eq!(
            run(&processor, &mut session, "erase 18 18"),
            vec!["erased 1 object(s)"]
        );

        let mut out = Vec::new();
        assert_eq!(
            processor.process_line(&mut session, "quit", &mut out),
            LineOutcome::Quit
        );
        assert!(out.is_empty());
    }

    #[test]
    fn stats_line_is_json() {
        let temp = TempDir::new().expect("tempdir");
        let mut session = session_in(&temp);
        let processor = CommandProcessor::new();
        run(&processor, &mut session, "place brick 0 0");

        let out = run(&processor, &mut session, "stats");
        let stats: serde_json::Value = serde_json::from_str(&out[0]).expect("json");
        assert_eq!(stats["object_count"], 1);
        assert_eq!(stats["chunk_count"], 1);
    }
}
