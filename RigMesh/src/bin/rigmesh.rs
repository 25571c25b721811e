fn main() -> anyhow::Result<()> {
    rigmesh::cli::run_cli()
}
