fn main() -> anyhow::Result<()> {
    wrrproxy::run()
}
