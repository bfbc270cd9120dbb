use fncli::{subcommands, Command, Param, Signature};

fn main() {
    let add = Command::new(
        "add",
        Signature::new()
            .add(Param::variadic("item"))
            .add(Param::flag("dedupe", false)),
        |args| {
            let mut items = args.seq("item").to_vec();
            if args.flag("dedupe") {
                items.dedup();
            }
            Ok(Some(format!("added: {}", items.join(", "))))
        },
    )
    .try_build()
    .expect("the 'add' declaration is well formed");

    let remove = Command::new(
        "remove",
        Signature::new().add(Param::required("item")),
        |args| Ok(Some(format!("removed: {}", args.str("item").unwrap()))),
    )
    .try_build()
    .expect("the 'remove' declaration is well formed");

    let tool = subcommands([("add", add), ("remove", remove)]).build();

    // `demo_sub_command add --help` renders the help of 'add', not of the
    // delegator; `demo_sub_command nonexistent` exits 2 on the choice check.
    tool.execute();
}
