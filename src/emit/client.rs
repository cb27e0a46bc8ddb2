use tracing::debug;

use super::code::{Block, Node, Renderer};
use super::OutputTree;
use crate::config::GeneratorConfig;
use crate::model::{Attribute, Primitive};
use crate::naming;
use crate::schema::{ClassSchema, DerivedSchema, ForeignKey, Membership};

pub const ROOT: &str = "flutter-mvp";

/// One Dart source file: imports, then top-level declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DartFile {
    pub imports: Vec<String>,
    pub decls: Vec<Block>,
}

impl DartFile {
    pub fn import(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.imports.contains(&path) {
            self.imports.push(path);
        }
    }

    /// First declaration or nested block whose head starts with `prefix`.
    pub fn find(&self, prefix: &str) -> Option<&Block> {
        self.decls.iter().find_map(|d| {
            if d.head.starts_with(prefix) {
                Some(d)
            } else {
                d.find(prefix)
            }
        })
    }

    pub fn contains_line(&self, needle: &str) -> bool {
        self.decls.iter().any(|d| d.head.contains(needle) || d.contains_line(needle))
    }

    pub fn render(&self) -> String {
        let mut nodes: Vec<Node> = self
            .imports
            .iter()
            .map(|i| match i.split_once(" as ") {
                Some((path, alias)) => Node::Line(format!("import '{}' as {};", path, alias)),
                None => Node::Line(format!("import '{}';", i)),
            })
            .collect();
        for decl in &self.decls {
            if !nodes.is_empty() {
                nodes.push(Node::Blank);
            }
            nodes.push(Node::Block(decl.clone()));
        }
        Renderer::new("  ").render(&nodes)
    }
}

/// `${expr}` inside a Dart string literal.
fn dollar(expr: &str) -> String {
    format!("${{{}}}", expr)
}

pub fn dart_type(p: Primitive) -> &'static str {
    match p {
        Primitive::String => "String",
        Primitive::Integer => "int",
        Primitive::Real => "double",
        Primitive::Boolean => "bool",
        Primitive::Date => "DateTime",
    }
}

fn decode(attribute: &Attribute) -> String {
    let key = format!("json['{}']", attribute.name);
    match attribute.primitive_type {
        Primitive::String => format!("{} as String? ?? ''", key),
        Primitive::Integer => format!("{} as int? ?? 0", key),
        Primitive::Real => format!("({} as num? ?? 0).toDouble()", key),
        Primitive::Boolean => format!("{} as bool? ?? false", key),
        Primitive::Date => format!("DateTime.tryParse({} as String? ?? '') ?? DateTime.now()", key),
    }
}

fn encode(attribute: &Attribute) -> String {
    match attribute.primitive_type {
        Primitive::Date => format!("{}.toIso8601String().substring(0, 10)", attribute.name),
        _ => attribute.name.clone(),
    }
}

/// Dart expression rendering `var.attribute` inside a string literal.
fn shown(attribute: &Attribute, var: &str) -> String {
    match attribute.primitive_type {
        Primitive::Date => dollar(&format!("{}.{}.toIso8601String().substring(0, 10)", var, attribute.name)),
        _ => dollar(&format!("{}.{}", var, attribute.name)),
    }
}

/// Dart `String` expression labelling `var`, an instance of `class`.
fn label_of(class: &ClassSchema, var: &str) -> String {
    let display = class
        .display_attribute()
        .and_then(|name| class.attributes.iter().find(|a| a.name == name));
    match display {
        Some(a) if a.primitive_type == Primitive::String => format!("{}.{}", var, a.name),
        Some(a) => format!("'{}'", shown(a, var)),
        None => format!("'#{}'", dollar(&format!("{}.id", var))),
    }
}

/// `'Grade: ${row.grade}, Date: ...'`, or `None` without attributes.
fn summary(attributes: &[Attribute], var: &str) -> Option<String> {
    if attributes.is_empty() {
        return None;
    }
    let parts: Vec<String> = attributes
        .iter()
        .map(|a| format!("{}: {}", naming::upper_first(&a.name), shown(a, var)))
        .collect();
    Some(format!("'{}'", parts.join(", ")))
}

fn plural(class: &ClassSchema) -> String {
    format!("{}s", class.name)
}

fn model_import(class: &ClassSchema, depth: &str) -> String {
    format!("{}models/{}_model.dart", depth, class.table())
}

fn service_import(class: &ClassSchema, depth: &str) -> String {
    format!("{}services/{}_service.dart", depth, class.table())
}

fn show_message() -> Block {
    Block::new("void _showMessage(String message) {")
        .line("if (!mounted) return;")
        .line("ScaffoldMessenger.of(context).showSnackBar(SnackBar(content: Text(message)));")
}

/// `class X extends StatefulWidget`. A `?` type makes the parameter optional.
fn stateful_widget(name: &str, params: &[(String, String)]) -> Block {
    let mut block = Block::new(format!("class {} extends StatefulWidget {{", name));
    for (ty, param) in params {
        block = block.line(format!("final {} {};", ty, param));
    }
    if !params.is_empty() {
        block = block.blank();
    }
    let mut args = vec!["super.key".to_string()];
    for (ty, param) in params {
        if ty.ends_with('?') {
            args.push(format!("this.{}", param));
        } else {
            args.push(format!("required this.{}", param));
        }
    }
    block
        .line(format!("const {}({{{}}});", name, args.join(", ")))
        .blank()
        .line("@override")
        .line(format!("State<{0}> createState() => _{0}State();", name))
}

// ---------------------------------------------------------------- inputs

/// State, widget and value expressions for one editable attribute.
struct Input<'a> {
    attribute: &'a Attribute,
}

impl<'a> Input<'a> {
    fn var(&self) -> String {
        let name = &self.attribute.name;
        match self.attribute.primitive_type {
            Primitive::Boolean => format!("_{}Value", name),
            Primitive::Date => format!("_{}Date", name),
            _ => format!("_{}Controller", name),
        }
    }

    fn uses_controller(&self) -> bool {
        matches!(
            self.attribute.primitive_type,
            Primitive::String | Primitive::Integer | Primitive::Real
        )
    }

    fn declaration(&self) -> String {
        match self.attribute.primitive_type {
            Primitive::Boolean => format!("bool {} = false;", self.var()),
            Primitive::Date => format!("DateTime? {};", self.var()),
            _ => format!("final {} = TextEditingController();", self.var()),
        }
    }

    fn load_from(&self, item: &str) -> String {
        let value = format!("{}.{}", item, self.attribute.name);
        match self.attribute.primitive_type {
            Primitive::String => format!("{}.text = {};", self.var(), value),
            Primitive::Integer | Primitive::Real => format!("{}.text = {}.toString();", self.var(), value),
            _ => format!("{} = {};", self.var(), value),
        }
    }

    fn value(&self) -> String {
        let text = format!("{}.text.trim()", self.var());
        match self.attribute.primitive_type {
            Primitive::String => text,
            Primitive::Integer => format!("int.tryParse({}) ?? 0", text),
            Primitive::Real => format!("double.tryParse({}) ?? 0.0", text),
            Primitive::Boolean => self.var(),
            Primitive::Date => format!("{} ?? DateTime.now()", self.var()),
        }
    }

    fn widget(&self) -> Vec<Node> {
        let label = naming::upper_first(&self.attribute.name);
        let var = self.var();
        let widget = match self.attribute.primitive_type {
            Primitive::Boolean => Block::with_tail("SwitchListTile(", "),")
                .line(format!("title: const Text('{}'),", label))
                .line(format!("value: {},", var))
                .line(format!("onChanged: (value) => setState(() => {} = value),", var)),
            Primitive::Date => Block::with_tail("ListTile(", "),")
                .line(format!("title: const Text('{}'),", label))
                .line(format!(
                    "subtitle: Text({0} == null ? 'Pick a date' : {0}!.toIso8601String().substring(0, 10)),",
                    var
                ))
                .line("trailing: const Icon(Icons.calendar_today),")
                .block(
                    Block::with_tail("onTap: () async {", "},")
                        .block(
                            Block::with_tail("final picked = await showDatePicker(", ");")
                                .line("context: context,")
                                .line(format!("initialDate: {} ?? DateTime.now(),", var))
                                .line("firstDate: DateTime(1900),")
                                .line("lastDate: DateTime(2100),"),
                        )
                        .line(format!("if (picked != null) setState(() => {} = picked);", var)),
                ),
            p => {
                let mut validator = Block::with_tail("validator: (value) {", "},")
                    .line("if (value == null || value.trim().isEmpty) return 'Required';");
                let keyboard = match p {
                    Primitive::Integer => {
                        validator = validator
                            .line("if (int.tryParse(value.trim()) == null) return 'Must be a whole number';");
                        "TextInputType.number"
                    }
                    Primitive::Real => {
                        validator =
                            validator.line("if (double.tryParse(value.trim()) == null) return 'Must be a number';");
                        "const TextInputType.numberWithOptions(decimal: true)"
                    }
                    _ => "TextInputType.text",
                };
                Block::with_tail("TextFormField(", "),")
                    .line(format!("controller: {},", var))
                    .line(format!(
                        "decoration: const InputDecoration(labelText: '{}', border: OutlineInputBorder()),",
                        label
                    ))
                    .line(format!("keyboardType: {},", keyboard))
                    .block(validator.line("return null;"))
            }
        };
        vec![Node::Block(widget), Node::Line("const SizedBox(height: 16),".to_string())]
    }
}

fn inputs(attributes: &[Attribute]) -> Vec<Input<'_>> {
    attributes.iter().map(|attribute| Input { attribute }).collect()
}

fn dispose(inputs: &[Input<'_>]) -> Option<Block> {
    let controllers: Vec<String> = inputs
        .iter()
        .filter(|i| i.uses_controller())
        .map(|i| format!("{}.dispose();", i.var()))
        .collect();
    if controllers.is_empty() {
        return None;
    }
    Some(
        Block::new("void dispose() {")
            .lines(controllers)
            .line("super.dispose();"),
    )
}

/// `{for (final o in list) o.id: label}`.
fn options_map(class: &ClassSchema, list: &str) -> String {
    format!("{{for (final o in {}) o.id: {}}}", list, label_of(class, "o"))
}

// ---------------------------------------------------------------- model

pub fn model(class: &ClassSchema) -> DartFile {
    let name = &class.name;
    let mut body = Block::new(format!("class {} {{", name)).line("final int id;");
    for a in &class.attributes {
        body = body.line(format!("final {} {};", dart_type(a.primitive_type), a.name));
    }
    for fk in &class.foreign_keys {
        body = body.line(format!("final int? {};", fk.field_name));
    }

    let mut ctor = Block::with_tail(format!("{}({{", name), "});").line("required this.id,");
    for a in &class.attributes {
        ctor = ctor.line(format!("required this.{},", a.name));
    }
    for fk in &class.foreign_keys {
        ctor = ctor.line(format!("this.{},", fk.field_name));
    }

    let mut from = Block::with_tail(format!("return {}(", name), ");").line("id: json['id'] as int? ?? 0,");
    for a in &class.attributes {
        from = from.line(format!("{}: {},", a.name, decode(a)));
    }
    for fk in &class.foreign_keys {
        from = from.line(format!("{0}: json['{0}'] as int?,", fk.field_name));
    }

    let mut to = Block::with_tail("return {", "};").line("if (id != 0) 'id': id,");
    for a in &class.attributes {
        to = to.line(format!("'{}': {},", a.name, encode(a)));
    }
    for fk in &class.foreign_keys {
        to = to.line(format!("'{0}': {0},", fk.field_name));
    }

    body = body
        .blank()
        .block(ctor)
        .blank()
        .block(Block::new(format!("factory {}.fromJson(Map<String, dynamic> json) {{", name)).block(from))
        .blank()
        .block(Block::new("Map<String, dynamic> toJson() {").block(to));

    DartFile {
        imports: Vec::new(),
        decls: vec![body],
    }
}

// ---------------------------------------------------------------- service

pub fn service(class: &ClassSchema) -> DartFile {
    let name = &class.name;
    let path = class.resource_path();
    let request = |call: &str, url: &str, body: bool| {
        let mut b = Block::with_tail(format!("final response = await http.{}(", call), ").timeout(ApiConfig.timeout);")
            .line(format!("Uri.parse(ApiConfig.endpoint({})),", url))
            .line("headers: ApiConfig.headers,");
        if body {
            b = b.line("body: json.encode(item.toJson()),");
        }
        b
    };
    let failure = |what: &str| {
        format!(
            "throw Exception('Failed to {} {}: {}');",
            what,
            naming::table_name(name),
            dollar("response.statusCode")
        )
    };

    let body = Block::new(format!("class {}Service {{", name))
        .line(format!("static const String _path = '{}';", path))
        .blank()
        .block(
            Block::new(format!("Future<List<{}>> getAll() async {{", name))
                .block(request("get", "_path", false))
                .block(Block::new("if (response.statusCode != 200) {").line(failure("load")))
                .line("final List<dynamic> jsonList = json.decode(response.body);")
                .line(format!("return jsonList.map((item) => {}.fromJson(item)).toList();", name)),
        )
        .blank()
        .block(
            Block::new(format!("Future<{}?> getById(int id) async {{", name))
                .block(request("get", "'$_path/$id'", false))
                .line("if (response.statusCode == 404) return null;")
                .block(Block::new("if (response.statusCode != 200) {").line(failure("load")))
                .line(format!("return {}.fromJson(json.decode(response.body));", name)),
        )
        .blank()
        .block(
            Block::new(format!("Future<{0}> create({0} item) async {{", name))
                .block(request("post", "_path", true))
                .block(Block::new("if (response.statusCode != 201) {").line(failure("create")))
                .line(format!("return {}.fromJson(json.decode(response.body));", name)),
        )
        .blank()
        .block(
            Block::new(format!("Future<{0}> update({0} item) async {{", name))
                .block(request("put", "'$_path/${item.id}'", true))
                .block(Block::new("if (response.statusCode != 200) {").line(failure("update")))
                .line(format!("return {}.fromJson(json.decode(response.body));", name)),
        )
        .blank()
        .block(
            Block::new("Future<bool> delete(int id) async {")
                .block(request("delete", "'$_path/$id'", false))
                .line("return response.statusCode == 204 || response.statusCode == 200;"),
        );

    DartFile {
        imports: vec![
            "dart:convert".to_string(),
            "package:http/http.dart as http".to_string(),
            "../config/api_config.dart".to_string(),
            model_import(class, "../"),
        ],
        decls: vec![body],
    }
}

// ---------------------------------------------------------------- list screen

fn details_class(m: &Membership<'_>) -> String {
    format!("{}{}DetailsScreen", m.owner.name, m.junction.name)
}

fn dialog_class(m: &Membership<'_>) -> String {
    format!("{}{}FormDialog", m.owner.name, m.junction.name)
}

fn labels_var(fk: &ForeignKey) -> String {
    format!("_{}Labels", fk.field_name)
}

pub fn list_screen(class: &ClassSchema, schema: &DerivedSchema) -> DartFile {
    let name = &class.name;
    let screen = format!("{}ListScreen", name);
    let memberships = schema.memberships_of(&class.class_id);
    let references: Vec<(&ForeignKey, &ClassSchema)> = class
        .foreign_keys
        .iter()
        .filter_map(|fk| Some((fk, schema.class(&fk.referenced_class_id)?)))
        .collect();

    let mut file = DartFile::default();
    file.import("package:flutter/material.dart");
    file.import(model_import(class, "../../"));
    file.import(service_import(class, "../../"));
    for (_, referenced) in &references {
        file.import(service_import(referenced, "../../"));
    }
    file.import("../../widgets/app_drawer.dart");
    file.import(format!("{}_form_screen.dart", class.table()));
    for m in &memberships {
        file.import(format!("{}_details_screen.dart", m.junction.table()));
    }

    let mut state = Block::new(format!("class _{0}State extends State<{0}> {{", screen))
        .line(format!("final {0}Service _service = {0}Service();", name))
        .line(format!("List<{}> _items = [];", name));
    for (fk, _) in &references {
        state = state.line(format!("Map<int, String> {} = {{}};", labels_var(fk)));
    }
    state = state
        .line("bool _isLoading = true;")
        .blank()
        .line("@override")
        .block(Block::new("void initState() {").line("super.initState();").line("_loadItems();"))
        .blank();

    let mut fetch = Block::with_tail("try {", "").line("final items = await _service.getAll();");
    let mut assign = Block::with_tail("setState(() {", "});").line("_items = items;");
    for (fk, referenced) in &references {
        let list = format!("{}Rows", fk.field_name);
        fetch = fetch.line(format!("final {} = await {}Service().getAll();", list, referenced.name));
        assign = assign.line(format!("{} = {};", labels_var(fk), options_map(referenced, &list)));
    }
    fetch = fetch.line("if (!mounted) return;").block(assign);
    state = state
        .block(
            Block::new("Future<void> _loadItems() async {")
                .line("setState(() => _isLoading = true);")
                .block(fetch)
                .block(Block::with_tail("} catch (e) {", "").line(format!(
                    "_showMessage('Could not load {}: $e');",
                    class.resource_path()
                )))
                .block(
                    Block::new("} finally {").line("if (mounted) setState(() => _isLoading = false);"),
                ),
        )
        .blank()
        .block(show_message())
        .blank()
        .block(
            Block::new(format!("Future<void> _openForm([{}? item]) async {{", name))
                .block(
                    Block::with_tail("final saved = await Navigator.push<bool>(", ");")
                        .line("context,")
                        .line(format!("MaterialPageRoute(builder: (context) => {}FormScreen(item: item)),", name)),
                )
                .line("if (saved == true) _loadItems();"),
        );

    for m in &memberships {
        state = state.blank().block(
            Block::new(format!("Future<void> _open{}(int id) async {{", plural(m.junction)))
                .block(
                    Block::with_tail("await Navigator.push(", ");")
                        .line("context,")
                        .line(format!(
                            "MaterialPageRoute(builder: (context) => {}(ownerId: id)),",
                            details_class(m)
                        )),
                )
                .line("_loadItems();"),
        );
    }

    state = state
        .blank()
        .block(
            Block::new(format!("Future<void> _confirmDelete({} item) async {{", name))
                .block(
                    Block::with_tail("final confirmed = await showDialog<bool>(", ");")
                        .line("context: context,")
                        .block(
                            Block::with_tail("builder: (context) => AlertDialog(", "),")
                                .line(format!("title: const Text('Delete {}'),", name))
                                .line("content: const Text('This cannot be undone.'),")
                                .block(
                                    Block::with_tail("actions: [", "],")
                                        .line("TextButton(onPressed: () => Navigator.pop(context, false), child: const Text('Cancel')),")
                                        .line("ElevatedButton(onPressed: () => Navigator.pop(context, true), child: const Text('Delete')),"),
                                ),
                        ),
                )
                .line("if (confirmed != true) return;")
                .line("final deleted = await _service.delete(item.id);")
                .line(format!(
                    "_showMessage(deleted ? '{} deleted' : 'Could not delete {}');",
                    name,
                    naming::table_name(name)
                ))
                .line("_loadItems();"),
        )
        .blank()
        .line("@override")
        .block(list_build(class))
        .blank()
        .block(body_method(
            "_isLoading",
            "_items.isEmpty",
            &format!("No {} yet", class.resource_path()),
            Block::with_tail("return RefreshIndicator(", ");")
                .line("onRefresh: _loadItems,")
                .block(
                    Block::with_tail("child: ListView.builder(", "),")
                        .line("itemCount: _items.length,")
                        .line("itemBuilder: (context, index) => _buildItem(_items[index]),"),
                ),
        ))
        .blank()
        .block(list_item(class, &references, &memberships));

    file.decls = vec![stateful_widget(&screen, &[]), state];
    file
}

/// Loading spinner, empty notice, or `list`.
fn body_method(loading: &str, empty: &str, empty_text: &str, list: Block) -> Block {
    Block::new("Widget _buildBody() {")
        .block(Block::new(format!("if ({}) {{", loading)).line("return const Center(child: CircularProgressIndicator());"))
        .block(
            Block::new(format!("if ({}) {{", empty))
                .line(format!("return const Center(child: Text('{}'));", empty_text)),
        )
        .block(list)
}

fn list_build(class: &ClassSchema) -> Block {
    Block::new("Widget build(BuildContext context) {").block(
        Block::with_tail("return Scaffold(", ");")
            .block(
                Block::with_tail("appBar: AppBar(", "),")
                    .line(format!("title: const Text('{}'),", plural(class)))
                    .line("backgroundColor: Theme.of(context).colorScheme.inversePrimary,"),
            )
            .line("drawer: const AppDrawer(),")
            .block(
                Block::with_tail("floatingActionButton: FloatingActionButton(", "),")
                    .line("onPressed: () => _openForm(),")
                    .line(format!("tooltip: 'Add {}',", class.name))
                    .line("child: const Icon(Icons.add),"),
            )
            .line("body: _buildBody(),"),
    )
}

fn list_item(
    class: &ClassSchema,
    references: &[(&ForeignKey, &ClassSchema)],
    memberships: &[Membership<'_>],
) -> Block {
    let mut rows = Block::with_tail("children: [", "],");
    for a in &class.attributes {
        rows = rows.line(format!("Text('{}: {}'),", naming::upper_first(&a.name), shown(a, "item")));
    }
    for (fk, _) in references {
        rows = rows.line(format!(
            "Text('{}: {}'),",
            naming::foreign_key_label(&fk.field_name),
            dollar(&format!("{}[item.{}] ?? '-'", labels_var(fk), fk.field_name))
        ));
    }

    let mut actions = Block::with_tail("children: [", "],");
    for m in memberships {
        actions = actions.block(
            Block::with_tail("IconButton(", "),")
                .line("icon: const Icon(Icons.list_alt, color: Colors.green),")
                .line(format!("tooltip: '{}',", plural(m.junction)))
                .line(format!("onPressed: () => _open{}(item.id),", plural(m.junction))),
        );
    }
    actions = actions
        .block(
            Block::with_tail("IconButton(", "),")
                .line("icon: const Icon(Icons.edit, color: Colors.blue),")
                .line("tooltip: 'Edit',")
                .line("onPressed: () => _openForm(item),"),
        )
        .block(
            Block::with_tail("IconButton(", "),")
                .line("icon: const Icon(Icons.delete, color: Colors.red),")
                .line("tooltip: 'Delete',")
                .line("onPressed: () => _confirmDelete(item),"),
        );

    Block::new(format!("Widget _buildItem({} item) {{", class.name)).block(
        Block::with_tail("return Card(", ");")
            .line("margin: const EdgeInsets.symmetric(horizontal: 16, vertical: 8),")
            .block(
                Block::with_tail("child: ListTile(", "),")
                    .line(format!("title: Text({}),", label_of(class, "item")))
                    .block(
                        Block::with_tail("subtitle: Column(", "),")
                            .line("crossAxisAlignment: CrossAxisAlignment.start,")
                            .block(rows),
                    )
                    .block(
                        Block::with_tail("trailing: Row(", "),")
                            .line("mainAxisSize: MainAxisSize.min,")
                            .block(actions),
                    ),
            ),
    )
}

// ---------------------------------------------------------------- form screen

fn rows_var(junction: &ClassSchema) -> String {
    format!("_{}Rows", naming::lower_first(&junction.name))
}

fn original_rows_var(junction: &ClassSchema) -> String {
    format!("_{}OriginalRows", naming::lower_first(&junction.name))
}

fn far_options_var(junction: &ClassSchema) -> String {
    format!("_{}Options", naming::lower_first(&junction.name))
}

fn options_var(fk: &ForeignKey) -> String {
    format!("_{}Options", fk.field_name)
}

/// Junction row rebuilt for a persisted owner: owner key replaced, the rest copied.
fn junction_copy(m: &Membership<'_>, row: &str, owner_id: &str) -> Block {
    let mut b = Block::with_tail(format!("{}(", m.junction.name), "),").line("id: 0,");
    for a in &m.junction.attributes {
        b = b.line(format!("{0}: {1}.{0},", a.name, row));
    }
    for fk in &m.junction.foreign_keys {
        if fk.field_name == m.owner_key.field_name {
            b = b.line(format!("{}: {},", fk.field_name, owner_id));
        } else {
            b = b.line(format!("{0}: {1}.{0},", fk.field_name, row));
        }
    }
    b
}

pub fn form_screen(class: &ClassSchema, schema: &DerivedSchema) -> DartFile {
    let name = &class.name;
    let screen = format!("{}FormScreen", name);
    let memberships = schema.memberships_of(&class.class_id);
    let references: Vec<(&ForeignKey, &ClassSchema)> = class
        .foreign_keys
        .iter()
        .filter_map(|fk| Some((fk, schema.class(&fk.referenced_class_id)?)))
        .collect();
    let fields = inputs(&class.attributes);

    let mut file = DartFile::default();
    file.import("package:flutter/material.dart");
    file.import(model_import(class, "../../"));
    file.import(service_import(class, "../../"));
    for (_, referenced) in &references {
        file.import(service_import(referenced, "../../"));
    }
    for m in &memberships {
        file.import(model_import(m.junction, "../../"));
        file.import(service_import(m.junction, "../../"));
        file.import(service_import(m.far, "../../"));
        file.import(format!("{}_form_dialog.dart", m.junction.table()));
    }

    let mut state = Block::new(format!("class _{0}State extends State<{0}> {{", screen))
        .line(format!("final {0}Service _service = {0}Service();", name))
        .line("final _formKey = GlobalKey<FormState>();");
    for input in &fields {
        state = state.line(input.declaration());
    }
    for (fk, _) in &references {
        state = state
            .line(format!("int? _{};", fk.field_name))
            .line(format!("Map<int, String> {} = {{}};", options_var(fk)));
    }
    for m in &memberships {
        state = state
            .line(format!("List<{}> {} = [];", m.junction.name, rows_var(m.junction)))
            .line(format!("List<{}> {} = [];", m.junction.name, original_rows_var(m.junction)))
            .line(format!("Map<int, String> {} = {{}};", far_options_var(m.junction)));
    }
    state = state.line("bool _isSaving = false;").blank().line("bool get _isEditing => widget.item != null;").blank();

    let mut load_item = Block::new("if (item != null) {");
    for input in &fields {
        load_item = load_item.line(input.load_from("item"));
    }
    for (fk, _) in &references {
        load_item = load_item.line(format!("_{0} = item.{0};", fk.field_name));
    }
    let needs_options = !references.is_empty() || !memberships.is_empty();
    let mut init = Block::new("void initState() {")
        .line("super.initState();")
        .line("final item = widget.item;")
        .block(load_item);
    if needs_options {
        init = init.line("_loadOptions();");
    }
    state = state.line("@override").block(init);

    if let Some(dispose) = dispose(&fields) {
        state = state.blank().line("@override").block(dispose);
    }

    if needs_options {
        let mut fetch = Block::with_tail("try {", "");
        let mut assign = Block::with_tail("setState(() {", "});");
        for (fk, referenced) in &references {
            let list = format!("{}Rows", fk.field_name);
            fetch = fetch.line(format!("final {} = await {}Service().getAll();", list, referenced.name));
            assign = assign.line(format!("{} = {};", options_var(fk), options_map(referenced, &list)));
        }
        for m in &memberships {
            let junction = naming::lower_first(&m.junction.name);
            let far_list = format!("{}Candidates", junction);
            let existing = format!("{}Existing", junction);
            fetch = fetch
                .line(format!("final {} = await {}Service().getAll();", far_list, m.far.name))
                .line(format!(
                    "final {} = widget.item == null ? <{}>[] : (await {}Service().getAll()).where((row) => row.{} == widget.item!.id).toList();",
                    existing, m.junction.name, m.junction.name, m.owner_key.field_name
                ));
            assign = assign
                .line(format!("{} = {};", far_options_var(m.junction), options_map(m.far, &far_list)))
                .line(format!("{} = List.of({});", rows_var(m.junction), existing))
                .line(format!("{} = List.of({});", original_rows_var(m.junction), existing));
        }
        fetch = fetch.line("if (!mounted) return;").block(assign);
        state = state.blank().block(
            Block::new("Future<void> _loadOptions() async {")
                .block(fetch)
                .block(Block::new("} catch (e) {").line("_showMessage('Could not load options: $e');")),
        );
    }

    state = state.blank().block(show_message());

    for m in &memberships {
        let rows = rows_var(m.junction);
        state = state
            .blank()
            .block(
                Block::new(format!("Future<void> _add{}() async {{", m.junction.name))
                    .block(
                        Block::with_tail(format!("final row = await showDialog<{}>(", m.junction.name), ");")
                            .line("context: context,")
                            .block(
                                Block::with_tail(format!("builder: (context) => {}(", dialog_class(m)), "),")
                                    .line("ownerId: widget.item?.id ?? 0,")
                                    .line(format!("options: {},", far_options_var(m.junction)))
                                    .line(format!("existing: {},", rows)),
                            ),
                    )
                    .line(format!("if (row != null) setState(() => {}.add(row));", rows)),
            )
            .blank()
            .block(
                Block::new(format!("Future<void> _save{}(int ownerId) async {{", plural(m.junction)))
                    .line(format!("final service = {}Service();", m.junction.name))
                    .block(
                        Block::new(format!("for (final row in {}) {{", original_rows_var(m.junction)))
                            .line("await service.delete(row.id);"),
                    )
                    .block(
                        Block::new(format!("for (final row in {}) {{", rows)).block(
                            Block::with_tail("await service.create(", ");")
                                .nodes([Node::Block(junction_copy(m, "row", "ownerId"))]),
                        ),
                    ),
            );
    }

    let mut item = Block::with_tail(format!("final item = {}(", name), ");").line("id: widget.item?.id ?? 0,");
    for input in &fields {
        item = item.line(format!("{}: {},", input.attribute.name, input.value()));
    }
    for (fk, _) in &references {
        item = item.line(format!("{0}: _{0},", fk.field_name));
    }
    let mut attempt = Block::with_tail("try {", "")
        .block(item)
        .line("final saved = _isEditing ? await _service.update(item) : await _service.create(item);");
    for m in &memberships {
        attempt = attempt.line(format!("await _save{}(saved.id);", plural(m.junction)));
    }
    attempt = attempt.line("if (!mounted) return;").line("Navigator.pop(context, true);");
    state = state.blank().block(
        Block::new("Future<void> _save() async {")
            .line("if (!_formKey.currentState!.validate()) return;")
            .line("setState(() => _isSaving = true);")
            .block(attempt)
            .block(Block::with_tail("} catch (e) {", "").line(format!(
                "_showMessage('Could not save {}: $e');",
                naming::table_name(name)
            )))
            .block(Block::new("} finally {").line("if (mounted) setState(() => _isSaving = false);")),
    );

    let mut children = Block::with_tail("children: [", "],");
    for input in &fields {
        children = children.nodes(input.widget());
    }
    for (fk, _) in &references {
        children = children
            .block(
                Block::with_tail("DropdownButtonFormField<int>(", "),")
                    .line(format!(
                        "value: {}.containsKey(_{}) ? _{} : null,",
                        options_var(fk),
                        fk.field_name,
                        fk.field_name
                    ))
                    .line(format!(
                        "decoration: const InputDecoration(labelText: '{}', border: OutlineInputBorder()),",
                        naming::foreign_key_label(&fk.field_name)
                    ))
                    .line(format!(
                        "items: {}.entries.map((e) => DropdownMenuItem<int>(value: e.key, child: Text(e.value))).toList(),",
                        options_var(fk)
                    ))
                    .line(format!("onChanged: (value) => setState(() => _{} = value),", fk.field_name)),
            )
            .line("const SizedBox(height: 16),");
    }
    for m in &memberships {
        children = children.block(membership_section(m)).line("const SizedBox(height: 16),");
    }
    children = children.block(
        Block::with_tail("ElevatedButton(", "),")
            .line("onPressed: _isSaving ? null : _save,")
            .line("child: Text(_isSaving ? 'Saving...' : 'Save'),"),
    );

    let build = Block::new("Widget build(BuildContext context) {").block(
        Block::with_tail("return Scaffold(", ");")
            .block(
                Block::with_tail("appBar: AppBar(", "),")
                    .line(format!("title: Text(_isEditing ? 'Edit {0}' : 'New {0}'),", name))
                    .line("backgroundColor: Theme.of(context).colorScheme.inversePrimary,"),
            )
            .block(
                Block::with_tail("body: Form(", "),")
                    .line("key: _formKey,")
                    .block(
                        Block::with_tail("child: ListView(", "),")
                            .line("padding: const EdgeInsets.all(16),")
                            .block(children),
                    ),
            ),
    );
    state = state.blank().line("@override").block(build);

    file.decls = vec![
        stateful_widget(&screen, &[(format!("{}?", name), "item".to_string())]),
        state,
    ];
    file
}

fn membership_section(m: &Membership<'_>) -> Block {
    let rows = rows_var(m.junction);
    let far_key = &m.far_key.field_name;
    let mut tile = Block::with_tail("ListTile(", "),").line(format!(
        "title: Text({}[row.{}] ?? '#{}'),",
        far_options_var(m.junction),
        far_key,
        dollar(&format!("row.{}", far_key))
    ));
    if let Some(text) = summary(&m.junction.attributes, "row") {
        tile = tile.line(format!("subtitle: Text({}),", text));
    }
    tile = tile.block(
        Block::with_tail("trailing: IconButton(", "),")
            .line("icon: const Icon(Icons.delete, color: Colors.red),")
            .line(format!("onPressed: () => setState(() => {}.remove(row)),", rows)),
    );

    Block::with_tail("Card(", "),").block(
        Block::with_tail("child: Padding(", "),")
            .line("padding: const EdgeInsets.all(12),")
            .block(
                Block::with_tail("child: Column(", "),")
                    .line("crossAxisAlignment: CrossAxisAlignment.start,")
                    .block(
                        Block::with_tail("children: [", "],")
                            .block(
                                Block::with_tail("Row(", "),")
                                    .line("mainAxisAlignment: MainAxisAlignment.spaceBetween,")
                                    .block(
                                        Block::with_tail("children: [", "],")
                                            .line(format!(
                                                "const Text('{}', style: TextStyle(fontSize: 18, fontWeight: FontWeight.bold)),",
                                                plural(m.junction)
                                            ))
                                            .line(format!(
                                                "TextButton.icon(onPressed: _add{}, icon: const Icon(Icons.add), label: const Text('Add')),",
                                                m.junction.name
                                            )),
                                    ),
                            )
                            .line(format!(
                                "if ({}.isEmpty) const Text('No {} yet', style: TextStyle(color: Colors.grey)),",
                                rows,
                                m.junction.resource_path()
                            ))
                            .block(Block::with_tail(format!("for (final row in {})", rows), "").block(tile)),
                    ),
            ),
    )
}

// ---------------------------------------------------------------- memberships

pub fn form_dialog(m: &Membership<'_>) -> DartFile {
    let dialog = dialog_class(m);
    let junction = &m.junction.name;
    let far_key = &m.far_key.field_name;
    let fields = inputs(&m.junction.attributes);

    let mut state = Block::new(format!("class _{0}State extends State<{0}> {{", dialog))
        .line("final _formKey = GlobalKey<FormState>();")
        .line(format!("int? _{};", far_key));
    for input in &fields {
        state = state.line(input.declaration());
    }
    state = state
        .blank()
        .line("/// Far-side rows not linked to this owner yet.")
        .line("List<MapEntry<int, String>> get _candidates => widget.options.entries")
        .line(format!(
            "    .where((entry) => !widget.existing.any((row) => row.{} == entry.key))",
            far_key
        ))
        .line("    .toList();");

    if let Some(dispose) = dispose(&fields) {
        state = state.blank().line("@override").block(dispose);
    }

    let mut row = Block::with_tail(format!("{}(", junction), "),").line("id: 0,");
    for input in &fields {
        row = row.line(format!("{}: {},", input.attribute.name, input.value()));
    }
    for fk in &m.junction.foreign_keys {
        if fk.field_name == m.owner_key.field_name {
            row = row.line(format!("{}: widget.ownerId,", fk.field_name));
        } else if &fk.field_name == far_key {
            row = row.line(format!("{0}: _{0},", fk.field_name));
        }
    }
    state = state.blank().block(
        Block::new("void _submit() {")
            .line("if (!_formKey.currentState!.validate()) return;")
            .block(Block::with_tail("Navigator.pop(", ");").line("context,").block(row)),
    );

    let mut children = Block::with_tail("children: [", "],")
        .block(
            Block::with_tail(
                format!(
                    "if (_candidates.isEmpty) const Text('Every {} is already linked.', style: TextStyle(color: Colors.orange)) else",
                    naming::table_name(&m.far.name)
                ),
                "",
            )
            .block(
                Block::with_tail("DropdownButtonFormField<int>(", "),")
                    .line(format!("value: _{},", far_key))
                    .line(format!(
                        "decoration: const InputDecoration(labelText: '{}', border: OutlineInputBorder()),",
                        m.far.name
                    ))
                    .line("items: _candidates.map((e) => DropdownMenuItem<int>(value: e.key, child: Text(e.value))).toList(),")
                    .line(format!("onChanged: (value) => setState(() => _{} = value),", far_key))
                    .line(format!(
                        "validator: (value) => value == null ? 'Pick a {}' : null,",
                        naming::table_name(&m.far.name)
                    )),
            ),
        )
        .line("const SizedBox(height: 16),");
    for input in &fields {
        children = children.nodes(input.widget());
    }

    let build = Block::new("Widget build(BuildContext context) {").block(
        Block::with_tail("return AlertDialog(", ");")
            .line(format!("title: const Text('Add {}'),", m.far.name))
            .block(
                Block::with_tail("content: Form(", "),")
                    .line("key: _formKey,")
                    .block(
                        Block::with_tail("child: SingleChildScrollView(", "),").block(
                            Block::with_tail("child: Column(", "),")
                                .line("mainAxisSize: MainAxisSize.min,")
                                .block(children),
                        ),
                    ),
            )
            .block(
                Block::with_tail("actions: [", "],")
                    .line("TextButton(onPressed: () => Navigator.pop(context), child: const Text('Cancel')),")
                    .line("ElevatedButton(onPressed: _candidates.isEmpty ? null : _submit, child: const Text('Add')),"),
            ),
    );
    state = state.blank().line("@override").block(build);

    let mut file = DartFile::default();
    file.import("package:flutter/material.dart");
    file.import(model_import(m.junction, "../../"));
    file.decls = vec![
        stateful_widget(
            &dialog,
            &[
                ("int".to_string(), "ownerId".to_string()),
                ("Map<int, String>".to_string(), "options".to_string()),
                (format!("List<{}>", junction), "existing".to_string()),
            ],
        ),
        state,
    ];
    file
}

pub fn details_screen(m: &Membership<'_>) -> DartFile {
    let screen = details_class(m);
    let junction = &m.junction.name;
    let far_key = &m.far_key.field_name;

    let mut tile = Block::with_tail("child: ListTile(", "),").line(format!(
        "title: Text(_options[row.{}] ?? '#{}'),",
        far_key,
        dollar(&format!("row.{}", far_key))
    ));
    if let Some(text) = summary(&m.junction.attributes, "row") {
        tile = tile.line(format!("subtitle: Text({}),", text));
    }
    tile = tile.block(
        Block::with_tail("trailing: IconButton(", "),")
            .line("icon: const Icon(Icons.delete, color: Colors.red),")
            .line("onPressed: () => _remove(row),"),
    );

    let state = Block::new(format!("class _{0}State extends State<{0}> {{", screen))
        .line(format!("final {0}Service _service = {0}Service();", junction))
        .line(format!("List<{}> _rows = [];", junction))
        .line("Map<int, String> _options = {};")
        .line("bool _isLoading = true;")
        .blank()
        .line("@override")
        .block(Block::new("void initState() {").line("super.initState();").line("_load();"))
        .blank()
        .block(
            Block::new("Future<void> _load() async {")
                .line("setState(() => _isLoading = true);")
                .block(
                    Block::with_tail("try {", "")
                        .line("final rows = await _service.getAll();")
                        .line(format!("final candidates = await {}Service().getAll();", m.far.name))
                        .line("if (!mounted) return;")
                        .block(
                            Block::with_tail("setState(() {", "});")
                                .line(format!(
                                    "_rows = rows.where((row) => row.{} == widget.ownerId).toList();",
                                    m.owner_key.field_name
                                ))
                                .line(format!("_options = {};", options_map(m.far, "candidates"))),
                        ),
                )
                .block(Block::with_tail("} catch (e) {", "").line(format!(
                    "_showMessage('Could not load {}: $e');",
                    m.junction.resource_path()
                )))
                .block(Block::new("} finally {").line("if (mounted) setState(() => _isLoading = false);")),
        )
        .blank()
        .block(show_message())
        .blank()
        .block(
            Block::new("Future<void> _add() async {")
                .block(
                    Block::with_tail(format!("final row = await showDialog<{}>(", junction), ");")
                        .line("context: context,")
                        .line(format!(
                            "builder: (context) => {}(ownerId: widget.ownerId, options: _options, existing: _rows),",
                            dialog_class(m)
                        )),
                )
                .line("if (row == null) return;")
                .block(Block::with_tail("try {", "").line("await _service.create(row);"))
                .block(Block::new("} catch (e) {").line(format!(
                    "_showMessage('Could not add {}: $e');",
                    naming::table_name(&m.far.name)
                )))
                .line("_load();"),
        )
        .blank()
        .block(
            Block::new(format!("Future<void> _remove({} row) async {{", junction))
                .line("final deleted = await _service.delete(row.id);")
                .line(format!("if (!deleted) _showMessage('Could not remove {}');", naming::table_name(&m.far.name)))
                .line("_load();"),
        )
        .blank()
        .line("@override")
        .block(
            Block::new("Widget build(BuildContext context) {").block(
                Block::with_tail("return Scaffold(", ");")
                    .block(
                        Block::with_tail("appBar: AppBar(", "),")
                            .line(format!("title: const Text('{} {}'),", m.owner.name, plural(m.junction)))
                            .line("backgroundColor: Theme.of(context).colorScheme.inversePrimary,"),
                    )
                    .block(
                        Block::with_tail("floatingActionButton: FloatingActionButton(", "),")
                            .line("onPressed: _isLoading ? null : _add,")
                            .line(format!("tooltip: 'Add {}',", m.far.name))
                            .line("child: const Icon(Icons.add),"),
                    )
                    .line("body: _buildBody(),"),
            ),
        )
        .blank()
        .block(body_method(
            "_isLoading",
            "_rows.isEmpty",
            &format!("No {} yet", m.junction.resource_path()),
            Block::with_tail("return ListView(", ");").block(
                Block::with_tail("children: [", "],").block(
                    Block::with_tail("for (final row in _rows)", "").block(
                        Block::with_tail("Card(", "),")
                            .line("margin: const EdgeInsets.symmetric(horizontal: 16, vertical: 4),")
                            .block(tile),
                    ),
                ),
            ),
        ));

    let mut file = DartFile::default();
    file.import("package:flutter/material.dart");
    file.import(model_import(m.junction, "../../"));
    file.import(service_import(m.junction, "../../"));
    file.import(service_import(m.far, "../../"));
    file.import(format!("{}_form_dialog.dart", m.junction.table()));
    file.decls = vec![stateful_widget(&screen, &[("int".to_string(), "ownerId".to_string())]), state];
    file
}

// ---------------------------------------------------------------- shared files

pub fn app_drawer(schema: &DerivedSchema) -> DartFile {
    let mut children = Block::with_tail("children: [", "],")
        .block(
            Block::with_tail("const DrawerHeader(", "),")
                .line("decoration: BoxDecoration(color: Colors.deepPurple),")
                .line("child: Text('CRUD Demo', style: TextStyle(color: Colors.white, fontSize: 24)),"),
        )
        .block(
            Block::with_tail("ListTile(", "),")
                .line("leading: const Icon(Icons.home),")
                .line("title: const Text('Home'),")
                .line("onTap: () => Navigator.pushNamedAndRemoveUntil(context, '/', (route) => false),"),
        )
        .line("const Divider(),");
    for class in schema.regular() {
        children = children.block(
            Block::with_tail("ListTile(", "),")
                .line("leading: const Icon(Icons.table_chart),")
                .line(format!("title: const Text('{}'),", plural(class)))
                .block(
                    Block::with_tail("onTap: () {", "},")
                        .line("Navigator.pop(context);")
                        .line(format!("Navigator.pushNamed(context, '/{}');", class.table())),
                ),
        );
    }

    let drawer = Block::new("class AppDrawer extends StatelessWidget {")
        .line("const AppDrawer({super.key});")
        .blank()
        .line("@override")
        .block(
            Block::new("Widget build(BuildContext context) {").block(
                Block::with_tail("return Drawer(", ");").block(
                    Block::with_tail("child: ListView(", "),")
                        .line("padding: EdgeInsets.zero,")
                        .block(children),
                ),
            ),
        );
    DartFile {
        imports: vec!["package:flutter/material.dart".to_string()],
        decls: vec![drawer],
    }
}

pub fn api_config(config: &GeneratorConfig) -> DartFile {
    let body = Block::new("class ApiConfig {")
        .line("/// Change this to reach the server from a device, e.g. your machine's LAN address.")
        .line(format!("static const String baseUrl = '{}';", config.api_base_url))
        .blank()
        .block(
            Block::with_tail("static const Map<String, String> headers = {", "};")
                .line("'Content-Type': 'application/json',")
                .line("'Accept': 'application/json',"),
        )
        .blank()
        .line("static const Duration timeout = Duration(seconds: 30);")
        .blank()
        .line("static String endpoint(String path) => '$baseUrl/$path';");
    DartFile {
        imports: Vec::new(),
        decls: vec![body],
    }
}

pub fn main_dart(schema: &DerivedSchema) -> DartFile {
    let mut file = DartFile::default();
    file.import("package:flutter/material.dart");
    let mut routes = Block::with_tail("routes: {", "},");
    for class in schema.regular() {
        file.import(format!("screens/{0}/{0}_list_screen.dart", class.table()));
        routes = routes.line(format!("'/{}': (context) => const {}ListScreen(),", class.table(), class.name));
    }
    file.import("widgets/app_drawer.dart");

    let entry = Block::new("void main() {").line("runApp(const App());");
    let app = Block::new("class App extends StatelessWidget {")
        .line("const App({super.key});")
        .blank()
        .line("@override")
        .block(
            Block::new("Widget build(BuildContext context) {").block(
                Block::with_tail("return MaterialApp(", ");")
                    .line("title: 'CRUD Demo',")
                    .line("theme: ThemeData(colorScheme: ColorScheme.fromSeed(seedColor: Colors.deepPurple), useMaterial3: true),")
                    .line("home: const HomeScreen(),")
                    .block(routes),
            ),
        );
    let home = Block::new("class HomeScreen extends StatelessWidget {")
        .line("const HomeScreen({super.key});")
        .blank()
        .line("@override")
        .block(
            Block::new("Widget build(BuildContext context) {").block(
                Block::with_tail("return Scaffold(", ");")
                    .block(
                        Block::with_tail("appBar: AppBar(", "),")
                            .line("title: const Text('CRUD Demo'),")
                            .line("backgroundColor: Theme.of(context).colorScheme.inversePrimary,"),
                    )
                    .line("drawer: const AppDrawer(),")
                    .block(
                        Block::with_tail("body: const Center(", "),").block(
                            Block::with_tail("child: Column(", "),")
                                .line("mainAxisAlignment: MainAxisAlignment.center,")
                                .block(
                                    Block::with_tail("children: [", "],")
                                        .line("Icon(Icons.dashboard, size: 80, color: Colors.grey),")
                                        .line("SizedBox(height: 16),")
                                        .line("Text('Pick an entity from the menu', style: TextStyle(fontSize: 18)),"),
                                ),
                        ),
                    ),
            ),
        );
    file.decls = vec![entry, app, home];
    file
}

pub fn pubspec() -> String {
    "\
name: flutter_mvp
description: Flutter CRUD client generated from a UML class diagram.
publish_to: 'none'
version: 1.0.0+1

environment:
  sdk: '>=3.0.0 <4.0.0'
  flutter: '>=3.10.0'

dependencies:
  flutter:
    sdk: flutter
  cupertino_icons: ^1.0.2
  http: ^1.1.0

dev_dependencies:
  flutter_test:
    sdk: flutter
  flutter_lints: ^2.0.0

flutter:
  uses-material-design: true
"
    .to_string()
}

pub fn analysis_options() -> String {
    "\
include: package:flutter_lints/flutter.yaml

linter:
  rules:
    prefer_const_constructors: false
    avoid_print: false
"
    .to_string()
}

pub fn readme(config: &GeneratorConfig) -> String {
    format!(
        "# Flutter CRUD client\n\nGenerated from a UML class diagram.\n\n## Run\n\n```\nflutter create --platforms=android .\nflutter pub get\nflutter run\n```\n\nThe app calls `{}`. Change `baseUrl` in `lib/config/api_config.dart` to point a device at your machine.\n\n## Layout\n\n```\nlib/\n  main.dart\n  config/api_config.dart\n  models/\n  services/\n  screens/\n  widgets/app_drawer.dart\n```\n",
        config.api_base_url
    )
}

/// Render the whole client project.
pub fn emit(schema: &DerivedSchema, config: &GeneratorConfig) -> OutputTree {
    let mut tree = OutputTree::new();
    let lib = format!("{}/lib", ROOT);

    for class in &schema.classes {
        let table = class.table();
        tree.add(format!("{}/models/{}_model.dart", lib, table), model(class).render());
        tree.add(format!("{}/services/{}_service.dart", lib, table), service(class).render());
    }
    for class in schema.regular() {
        let dir = format!("{}/screens/{}", lib, class.table());
        tree.add(
            format!("{}/{}_list_screen.dart", dir, class.table()),
            list_screen(class, schema).render(),
        );
        tree.add(
            format!("{}/{}_form_screen.dart", dir, class.table()),
            form_screen(class, schema).render(),
        );
    }
    for m in schema.memberships() {
        let dir = format!("{}/screens/{}", lib, m.owner.table());
        debug!(owner = %m.owner.name, junction = %m.junction.name, "membership screens");
        tree.add(
            format!("{}/{}_details_screen.dart", dir, m.junction.table()),
            details_screen(&m).render(),
        );
        tree.add(
            format!("{}/{}_form_dialog.dart", dir, m.junction.table()),
            form_dialog(&m).render(),
        );
    }

    tree.add(format!("{}/main.dart", lib), main_dart(schema).render());
    tree.add(format!("{}/widgets/app_drawer.dart", lib), app_drawer(schema).render());
    tree.add(format!("{}/config/api_config.dart", lib), api_config(config).render());
    tree.add(format!("{}/pubspec.yaml", ROOT), pubspec());
    tree.add(format!("{}/analysis_options.yaml", ROOT), analysis_options());
    tree.add(format!("{}/README.md", ROOT), readme(config));

    debug!(files = tree.len(), "rendered client project");
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::model::Diagram;
    use crate::schema;

    fn schema_of(source: &str) -> DerivedSchema {
        let (diagram, _) = Diagram::parse(source).unwrap();
        schema::derive(&diagram, &mut Diagnostics::new())
    }

    fn enrollment() -> DerivedSchema {
        schema_of(
            r#"
            class Course { title String }
            class Student { name String }
            class Enrollment associates Course, Student { grade Float }
            "#,
        )
    }

    #[test]
    fn test_model_fields() {
        let schema = schema_of(
            r#"
            class Author { name String }
            class Book { title String price Float published Date }
            rel { Author 1 -- * Book }
            "#,
        );
        let file = model(schema.class("Book").unwrap());
        let class = file.find("class Book").unwrap();
        for line in [
            "final int id;",
            "final double price;",
            "final DateTime published;",
            "final int? authorId;",
        ] {
            assert!(class.body.contains(&Node::Line(line.into())), "{}", line);
        }
        let from = file.find("return Book(").unwrap();
        assert!(from.contains_line("price: (json['price'] as num? ?? 0).toDouble(),"));
        assert!(from.contains_line("authorId: json['authorId'] as int?,"));
        let to = file.find("return {").unwrap();
        assert!(to.contains_line("'published': published.toIso8601String().substring(0, 10),"));
    }

    #[test]
    fn test_layout() {
        let tree = emit(&enrollment(), &GeneratorConfig::default());
        for path in [
            "flutter-mvp/lib/models/enrollment_model.dart",
            "flutter-mvp/lib/services/enrollment_service.dart",
            "flutter-mvp/lib/screens/course/course_list_screen.dart",
            "flutter-mvp/lib/screens/course/course_form_screen.dart",
            "flutter-mvp/lib/screens/course/enrollment_details_screen.dart",
            "flutter-mvp/lib/screens/course/enrollment_form_dialog.dart",
            "flutter-mvp/lib/screens/student/enrollment_details_screen.dart",
            "flutter-mvp/lib/screens/student/enrollment_form_dialog.dart",
            "flutter-mvp/lib/widgets/app_drawer.dart",
            "flutter-mvp/lib/config/api_config.dart",
            "flutter-mvp/lib/main.dart",
            "flutter-mvp/pubspec.yaml",
        ] {
            assert!(tree.contains(path), "{}", path);
        }
        assert!(!tree.contains("flutter-mvp/lib/screens/enrollment/enrollment_list_screen.dart"));
        assert!(tree
            .get("flutter-mvp/lib/config/api_config.dart")
            .unwrap()
            .contains("static const String baseUrl = 'http://localhost:8080';"));
    }

    #[test]
    fn test_both_owner_lists_reach_membership() {
        let schema = enrollment();
        for (owner, details) in [
            ("Course", "CourseEnrollmentDetailsScreen"),
            ("Student", "StudentEnrollmentDetailsScreen"),
        ] {
            let list = list_screen(schema.class(owner).unwrap(), &schema);
            assert!(list.contains_line("onPressed: () => _openEnrollments(item.id),"));
            assert!(list.contains_line(&format!("{}(ownerId: id)", details)));
            let screen = list
                .decls
                .iter()
                .find(|d| d.head.starts_with("class _"))
                .unwrap();
            assert!(screen.find("Future<void> _openEnrollments(int id) async {").is_some());
        }
    }

    #[test]
    fn test_dialog_excludes_linked_rows() {
        let schema = enrollment();
        let memberships = schema.memberships_of("Course");
        let dialog = form_dialog(&memberships[0]);
        assert!(dialog.contains_line(".where((entry) => !widget.existing.any((row) => row.studentId == entry.key))"));
        let submit = dialog.find("void _submit() {").unwrap();
        assert!(submit.contains_line("courseId: widget.ownerId,"));
        assert!(submit.contains_line("studentId: _studentId,"));
        assert!(submit.contains_line("grade: double.tryParse(_gradeController.text.trim()) ?? 0.0,"));

        let details = details_screen(&memberships[0]);
        assert!(details.contains_line("onPressed: _isLoading ? null : _add,"));
        assert!(details.contains_line("_rows = rows.where((row) => row.courseId == widget.ownerId).toList();"));
    }

    #[test]
    fn test_form_replaces_memberships_wholesale() {
        let schema = enrollment();
        let form = form_screen(schema.class("Student").unwrap(), &schema);
        let save = form.find("Future<void> _saveEnrollments(int ownerId) async {").unwrap();
        match &save.body[1] {
            Node::Block(b) => {
                assert_eq!(b.head, "for (final row in _enrollmentOriginalRows) {");
                assert!(b.contains_line("await service.delete(row.id);"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let create = save.find("Enrollment(").unwrap();
        assert!(create.contains_line("studentId: ownerId,"));
        assert!(create.contains_line("courseId: row.courseId,"));
        assert!(form.find("Future<void> _save() async {").unwrap().contains_line("await _saveEnrollments(saved.id);"));
    }

    #[test]
    fn test_display_attribute_fallback() {
        let schema = schema_of(
            r#"
            class Tag { }
            class Post { title String }
            rel { Tag 1 -- * Post }
            "#,
        );
        let list = list_screen(schema.class("Post").unwrap(), &schema);
        assert!(list.contains_line("_tagIdLabels = {for (final o in tagIdRows) o.id: '#${o.id}'};"));
        let tags = list_screen(schema.class("Tag").unwrap(), &schema);
        assert!(tags.contains_line("title: Text('#${item.id}'),"));
    }

    #[test]
    fn test_drawer_lists_regular_classes() {
        let schema = enrollment();
        let drawer = app_drawer(&schema);
        assert!(drawer.contains_line("Navigator.pushNamed(context, '/course');"));
        assert!(!drawer.contains_line("'/enrollment'"));
        let main = main_dart(&schema);
        assert!(main.contains_line("'/student': (context) => const StudentListScreen(),"));
    }
}
